use car_registry::core::manifest::{Command, Operation, OperationKind};
use car_registry::core::ContractReader;
use car_registry::domain::model::{CallId, DutyLabel};
use car_registry::{
    FileJournal, InMemoryLedger, Manifest, ManifestConfig, ManifestRunner, RegistryError,
};
use serde_json::json;
use tempfile::TempDir;

const VIN: &str = "4S4BRDSC2D2221585";

const MANIFEST: &str = r#"
[deployment]
from_account = 19

[vehicle]
vin = "4S4BRDSC2D2221585"
duties = ["registration", "license_plates"]

[duties]
registration = "1.5"
license_plates = "0.000000000000000001"
technical_inspection = "42"

[[insurance_policies]]
series = "АА"
number = "11"

[[insurance_policies]]
series = "ББ"
number = "22"

[[insurance_policies]]
series = "ВВ"
number = "33"

[[passports]]
region = "77"
series = "АА"
number = "123456"

[[registration_dates]]
start = 0
end = 1587795681

[[registration_dates]]
start = 1587795681
end = 1619331682

[[registration_dates]]
start = 1619331682
end = 0
"#;

fn manifest_from(content: &str) -> Manifest {
    ManifestConfig::from_toml_str(content)
        .unwrap()
        .to_manifest()
        .unwrap()
}

#[tokio::test]
async fn test_duty_prices_are_scaled_exactly() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let ledger = InMemoryLedger::new();
    let journal = FileJournal::open(temp_dir.path().join("journal.jsonl"))?;
    let runner = ManifestRunner::new(ledger.clone(), journal);

    let report = runner.run(&manifest_from(MANIFEST), None).await?;
    let duties = ledger.read(&report.address, "getDuties", &[]).await?;

    assert_eq!(
        duties,
        json!([
            { "dutyType": 0, "amount": "1500000000000000000" },
            { "dutyType": 1, "amount": "1" },
            { "dutyType": 4, "amount": "42000000000000000000" },
        ])
    );
    Ok(())
}

#[tokio::test]
async fn test_vehicle_records_are_retrievable() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let ledger = InMemoryLedger::new();
    let journal = FileJournal::open(temp_dir.path().join("journal.jsonl"))?;
    let report = ManifestRunner::new(ledger.clone(), journal)
        .run(&manifest_from(MANIFEST), None)
        .await?;

    let vin = [json!(VIN)];
    let policies = ledger
        .read(&report.address, "getInsurancePolicies", &vin)
        .await?;
    assert_eq!(
        policies,
        json!([
            { "series": "АА", "number": "11" },
            { "series": "ББ", "number": "22" },
            { "series": "ВВ", "number": "33" },
        ])
    );

    let car_duties = ledger.read(&report.address, "getCarDuties", &vin).await?;
    assert_eq!(car_duties, json!([0, 1]));

    let dates = ledger
        .read(&report.address, "getRegistrationDates", &vin)
        .await?;
    assert_eq!(dates[0], json!({ "start": 0, "end": 1587795681 }));
    assert_eq!(dates[2], json!({ "start": 1619331682, "end": 0 }));

    // 其他車輛查不到任何紀錄
    let other = [json!("JH4KA7650MC000000")];
    assert_eq!(
        ledger.read(&report.address, "getPassports", &other).await?,
        json!([])
    );
    Ok(())
}

#[tokio::test]
async fn test_vehicle_without_duties_gets_no_associations() -> anyhow::Result<()> {
    let content = MANIFEST.replace(
        "duties = [\"registration\", \"license_plates\"]",
        "duties = []",
    );
    let manifest = manifest_from(&content);
    assert_eq!(manifest.count_of(OperationKind::AssociateDuty), 0);
    assert_eq!(manifest.count_of(OperationKind::RegisterDuty), 3);

    let temp_dir = TempDir::new()?;
    let ledger = InMemoryLedger::new();
    let journal = FileJournal::open(temp_dir.path().join("journal.jsonl"))?;
    let report = ManifestRunner::new(ledger.clone(), journal)
        .run(&manifest, None)
        .await?;

    let car_duties = ledger
        .read(&report.address, "getCarDuties", &[json!(VIN)])
        .await?;
    assert_eq!(car_duties, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_rerun_from_file_journal_is_idempotent() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let journal_path = temp_dir.path().join("deployments").join("journal.jsonl");
    let ledger = InMemoryLedger::new();
    let manifest = manifest_from(MANIFEST);

    let first = ManifestRunner::new(ledger.clone(), FileJournal::open(&journal_path)?)
        .run(&manifest, None)
        .await?;
    assert!(first.deployed);
    assert_eq!(first.submitted.len(), manifest.len() + 1);

    // 重新開啟日誌，模擬第二次執行
    let reopened = FileJournal::open(&journal_path)?;
    assert_eq!(reopened.len(), manifest.len() + 1);

    let second = ManifestRunner::new(ledger.clone(), reopened)
        .run(&manifest, None)
        .await?;
    assert!(!second.deployed);
    assert!(second.submitted.is_empty());
    assert_eq!(second.address, first.address);
    assert_eq!(ledger.contract_count(), 1);

    let policies = ledger
        .read(&second.address, "getInsurancePolicies", &[json!(VIN)])
        .await?;
    assert_eq!(policies.as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_changed_manifest_is_rejected_on_resume() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let journal_path = temp_dir.path().join("journal.jsonl");
    let ledger = InMemoryLedger::new();

    ManifestRunner::new(ledger.clone(), FileJournal::open(&journal_path)?)
        .run(&manifest_from(MANIFEST), None)
        .await?;

    let repriced = MANIFEST.replace("registration = \"1.5\"", "registration = \"2\"");
    let result = ManifestRunner::new(ledger, FileJournal::open(&journal_path)?)
        .run(&manifest_from(&repriced), None)
        .await;

    assert!(matches!(
        result,
        Err(RegistryError::ReconciliationError { ref call_id, .. }) if call_id == "duty0"
    ));
    Ok(())
}

#[test]
fn test_colliding_call_ids_are_rejected() {
    let config = ManifestConfig::from_toml_str(MANIFEST).unwrap();
    let manifest = config.to_manifest().unwrap();

    let mut ids = manifest.call_ids();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);

    // 舊的編號方式讓規費與車輛規費共用 "duty" 前綴
    let mut commands = manifest.commands().to_vec();
    let association = commands
        .iter()
        .position(|c| c.operation.kind() == OperationKind::AssociateDuty)
        .unwrap();
    commands[association] = Command {
        id: CallId::new("duty0"),
        operation: commands[association].operation.clone(),
    };

    let result = Manifest::new(config.deployment_target(), commands);
    assert!(matches!(
        result,
        Err(RegistryError::DuplicateCallId { ref call_id }) if call_id == "duty0"
    ));
}

#[test]
fn test_call_ids_follow_declaration_order() {
    let manifest = manifest_from(MANIFEST);
    let ids: Vec<String> = manifest
        .commands()
        .iter()
        .map(|c| c.id.to_string())
        .collect();

    assert_eq!(
        ids,
        vec![
            "duty0",
            "duty1",
            "duty2",
            "carDuty0",
            "carDuty1",
            "addInsurancePolicy0",
            "addInsurancePolicy1",
            "addInsurancePolicy2",
            "addPassport0",
            "addRegistrationDate0",
            "addRegistrationDate1",
            "addRegistrationDate2",
        ]
    );

    match &manifest.commands()[3].operation {
        Operation::AssociateDuty(car_duty) => {
            assert_eq!(car_duty.vin, VIN);
            assert_eq!(car_duty.label, DutyLabel::Registration);
        }
        other => panic!("unexpected operation {:?}", other),
    }
}
