use car_registry::core::manifest::{DeploymentTarget, ManifestBuilder};
use car_registry::core::{ContractClient, ContractReader};
use car_registry::domain::model::{AccountRef, CallId, ContractAddress, DutyLabel};
use car_registry::domain::ports::{ContractCall, DeployRequest};
use car_registry::{ManifestRunner, MemoryJournal, RegistryError, RpcContractClient};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const VIN: &str = "4S4BRDSC2D2221585";
const ADDRESS: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

fn client_for(server: &MockServer) -> RpcContractClient {
    RpcContractClient::new(&server.url("/"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_deploy_sends_future_id_and_constructor_args() {
    let server = MockServer::start_async().await;
    let deploy_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/").json_body_partial(
                r#"{
                    "jsonrpc": "2.0",
                    "method": "registry_deploy",
                    "params": [{
                        "futureId": "CarRegistrationSystem#CarRegistrationSystem",
                        "contract": "CarRegistrationSystem",
                        "args": ["4S4BRDSC2D2221585", ""],
                        "from": 19
                    }]
                }"#,
            );
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "address": ADDRESS, "txHash": "0xabc" }
            }));
        })
        .await;

    let client = client_for(&server);
    let receipt = client
        .deploy(&DeployRequest {
            future_id: CallId::new("CarRegistrationSystem#CarRegistrationSystem"),
            contract: "CarRegistrationSystem".to_string(),
            constructor_args: vec![json!(VIN), json!("")],
            from: AccountRef(19),
            bytecode: None,
        })
        .await
        .unwrap();

    deploy_mock.assert_async().await;
    assert_eq!(receipt.address.as_str(), ADDRESS);
    assert_eq!(receipt.tx_hash, "0xabc");
}

#[tokio::test]
async fn test_submit_and_read() {
    let server = MockServer::start_async().await;
    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(
                r#"{
                    "method": "registry_sendTransaction",
                    "params": [{
                        "to": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                        "method": "addInsurancePolicy",
                        "args": ["4S4BRDSC2D2221585", "АА", "11"],
                        "from": 19
                    }]
                }"#,
            );
            then.status(200)
                .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": { "txHash": "0x01" } }));
        })
        .await;
    let call_mock = server
        .mock_async(|when, then| {
            when.method(POST).json_body_partial(
                r#"{ "method": "registry_call", "params": [{ "method": "getInsurancePolicies" }] }"#,
            );
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": [{ "series": "АА", "number": "11" }]
            }));
        })
        .await;

    let client = client_for(&server);
    let address = ContractAddress::parse(ADDRESS).unwrap();

    let receipt = client
        .submit(
            &address,
            &ContractCall {
                method: "addInsurancePolicy".to_string(),
                args: vec![json!(VIN), json!("АА"), json!("11")],
                from: AccountRef(19),
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.tx_hash, "0x01");

    let policies = client
        .read(&address, "getInsurancePolicies", &[json!(VIN)])
        .await
        .unwrap();
    assert_eq!(policies, json!([{ "series": "АА", "number": "11" }]));

    send_mock.assert_async().await;
    call_mock.assert_async().await;
}

#[tokio::test]
async fn test_rpc_error_is_propagated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 3, "message": "execution reverted: not owner" }
            }));
        })
        .await;

    let client = client_for(&server);
    let result = client
        .read(&ContractAddress::parse(ADDRESS).unwrap(), "owner", &[])
        .await;

    match result {
        Err(RegistryError::RpcError { code, message }) => {
            assert_eq!(code, 3);
            assert!(message.contains("not owner"));
        }
        other => panic!("expected RPC error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_runner_stops_at_first_failed_call() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .json_body_partial(r#"{ "method": "registry_deploy" }"#);
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "address": ADDRESS, "txHash": "0x00" }
            }));
        })
        .await;
    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .json_body_partial(r#"{ "method": "registry_sendTransaction" }"#);
            then.status(500);
        })
        .await;

    let target = DeploymentTarget {
        module: "CarRegistrationSystem".to_string(),
        contract: "CarRegistrationSystem".to_string(),
        from: AccountRef(19),
        constructor_args: vec![json!(VIN), json!("")],
    };
    let manifest = ManifestBuilder::new(target)
        .register_duty(DutyLabel::Registration, "1")
        .register_duty(DutyLabel::LicensePlates, "2")
        .build()
        .unwrap();

    let journal = MemoryJournal::new();
    let result = ManifestRunner::new(client_for(&server), journal.clone())
        .run(&manifest, None)
        .await;

    assert!(matches!(result, Err(RegistryError::HttpError(_))));
    // 只有部署被記錄；失敗的呼叫不會繼續往下送
    assert_eq!(journal.len(), 1);
    send_mock.assert_hits_async(1).await;
}
