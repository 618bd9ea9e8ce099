use crate::domain::model::ContractAddress;
use crate::domain::ports::{
    ContractCall, ContractClient, ContractReader, DeployReceipt, DeployRequest, TxReceipt,
};
use crate::utils::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEPLOY_METHOD: &str = "registry_deploy";
pub const SEND_METHOD: &str = "registry_sendTransaction";
pub const CALL_METHOD: &str = "registry_call";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DeployResult {
    address: String,
    #[serde(rename = "txHash")]
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    #[serde(rename = "txHash")]
    tx_hash: String,
}

/// JSON-RPC 2.0 傳輸：由節點端的部署服務負責簽章、廣播與確認
pub struct RpcContractClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcContractClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": [params],
        });

        tracing::debug!("Making RPC request {} #{} to {}", method, id, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: RpcResponse = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(RegistryError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        envelope.result.ok_or_else(|| RegistryError::RpcError {
            code: -32603,
            message: format!("{} response carried neither result nor error", method),
        })
    }
}

#[async_trait]
impl ContractClient for RpcContractClient {
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployReceipt> {
        let result = self
            .request(
                DEPLOY_METHOD,
                json!({
                    "futureId": request.future_id,
                    "contract": request.contract,
                    "bytecode": request.bytecode,
                    "args": request.constructor_args,
                    "from": request.from.0,
                }),
            )
            .await?;

        let deployed: DeployResult = serde_json::from_value(result)?;
        let address = ContractAddress::parse(&deployed.address)
            .map_err(|message| RegistryError::InterfaceError { message })?;

        Ok(DeployReceipt {
            address,
            tx_hash: deployed.tx_hash,
        })
    }

    async fn submit(&self, address: &ContractAddress, call: &ContractCall) -> Result<TxReceipt> {
        let result = self
            .request(
                SEND_METHOD,
                json!({
                    "to": address,
                    "method": call.method,
                    "args": call.args,
                    "from": call.from.0,
                }),
            )
            .await?;

        let sent: SendResult = serde_json::from_value(result)?;
        Ok(TxReceipt {
            tx_hash: sent.tx_hash,
        })
    }
}

#[async_trait]
impl ContractReader for RpcContractClient {
    async fn read(&self, address: &ContractAddress, method: &str, args: &[Value]) -> Result<Value> {
        self.request(
            CALL_METHOD,
            json!({
                "to": address,
                "method": method,
                "args": args,
            }),
        )
        .await
    }
}
