use crate::core::manifest::Manifest;
use crate::domain::model::{CallId, ContractAddress};
use crate::domain::ports::{ContractClient, Journal, JournalEntry};
use crate::utils::error::{RegistryError, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// 部署建構子在日誌中使用的方法名稱
pub const CONSTRUCTOR_METHOD: &str = "constructor";

/// 執行結果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub address: ContractAddress,
    pub deployed: bool,
    pub submitted: Vec<CallId>,
    pub skipped: Vec<CallId>,
    pub duration: Duration,
}

impl RunReport {
    pub fn summary(&self) -> HashMap<String, Value> {
        let mut summary = HashMap::new();

        summary.insert(
            "address".to_string(),
            Value::String(self.address.to_string()),
        );
        summary.insert("deployed".to_string(), Value::Bool(self.deployed));
        summary.insert(
            "submitted".to_string(),
            Value::Number(self.submitted.len().into()),
        );
        summary.insert(
            "skipped".to_string(),
            Value::Number(self.skipped.len().into()),
        );
        summary.insert(
            "duration_ms".to_string(),
            Value::Number((self.duration.as_millis() as u64).into()),
        );

        summary
    }
}

/// 依序執行清單；已記錄於日誌的呼叫直接跳過
pub struct ManifestRunner<C: ContractClient, J: Journal> {
    client: C,
    journal: J,
}

impl<C: ContractClient, J: Journal> ManifestRunner<C, J> {
    pub fn new(client: C, journal: J) -> Self {
        Self { client, journal }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub async fn run(&self, manifest: &Manifest, bytecode: Option<String>) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut submitted = Vec::new();
        let mut skipped = Vec::new();

        let target = manifest.deployment();
        let future_id = target.future_id();
        tracing::info!(
            "🚀 Running manifest for {} ({} calls)",
            future_id,
            manifest.len()
        );

        // 部署
        let (address, deployed) = match self.journal.lookup(&future_id).await? {
            Some(entry) => {
                reconcile(&entry, CONSTRUCTOR_METHOD, &target.constructor_args)?;
                let address = entry.address.ok_or_else(|| RegistryError::ReconciliationError {
                    call_id: future_id.to_string(),
                    reason: "journal entry has no deployed address".to_string(),
                })?;
                tracing::info!("⏭️ {} already deployed at {}", future_id, address);
                skipped.push(future_id.clone());
                (address, false)
            }
            None => {
                let request = target.deploy_request(bytecode);
                let receipt = self.client.deploy(&request).await.inspect_err(|e| {
                    tracing::error!("❌ Deployment of {} failed: {}", future_id, e);
                })?;

                self.journal
                    .record(JournalEntry {
                        call_id: future_id.clone(),
                        method: CONSTRUCTOR_METHOD.to_string(),
                        args: target.constructor_args.clone(),
                        address: Some(receipt.address.clone()),
                        tx_hash: receipt.tx_hash,
                        recorded_at: Utc::now(),
                    })
                    .await?;

                tracing::info!("✅ Deployed {} at {}", future_id, receipt.address);
                submitted.push(future_id.clone());
                (receipt.address, true)
            }
        };

        for command in manifest.commands() {
            let call = command.operation.to_call(target.from);

            if let Some(entry) = self.journal.lookup(&command.id).await? {
                reconcile(&entry, &call.method, &call.args)?;
                tracing::debug!("⏭️ Skipping {} (already completed)", command.id);
                skipped.push(command.id.clone());
                continue;
            }

            tracing::debug!("📤 {} -> {}", command.id, command.operation);
            let receipt = self.client.submit(&address, &call).await.inspect_err(|e| {
                tracing::error!("❌ Call {} failed: {}", command.id, e);
            })?;

            self.journal
                .record(JournalEntry {
                    call_id: command.id.clone(),
                    method: call.method,
                    args: call.args,
                    address: None,
                    tx_hash: receipt.tx_hash,
                    recorded_at: Utc::now(),
                })
                .await?;

            submitted.push(command.id.clone());
        }

        let report = RunReport {
            address,
            deployed,
            submitted,
            skipped,
            duration: start_time.elapsed(),
        };

        tracing::info!(
            "✅ Manifest complete (submitted: {}, skipped: {}, duration: {:?})",
            report.submitted.len(),
            report.skipped.len(),
            report.duration
        );

        Ok(report)
    }
}

/// 日誌紀錄必須與目前清單的同一識別碼完全一致
fn reconcile(entry: &JournalEntry, method: &str, args: &[Value]) -> Result<()> {
    if entry.method != method {
        return Err(RegistryError::ReconciliationError {
            call_id: entry.call_id.to_string(),
            reason: format!("method changed from '{}' to '{}'", entry.method, method),
        });
    }
    if entry.args.as_slice() != args {
        return Err(RegistryError::ReconciliationError {
            call_id: entry.call_id.to_string(),
            reason: format!(
                "arguments changed from {} to {}",
                Value::Array(entry.args.clone()),
                Value::Array(args.to_vec())
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::journal::MemoryJournal;
    use crate::adapters::ledger::InMemoryLedger;
    use crate::core::manifest::{DeploymentTarget, ManifestBuilder};
    use crate::domain::model::{AccountRef, DutyLabel};
    use crate::domain::ports::{ContractCall, ContractReader, DeployReceipt, DeployRequest, TxReceipt};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VIN: &str = "4S4BRDSC2D2221585";

    fn manifest_with_price(price: &str) -> Manifest {
        let mut builder = ManifestBuilder::new(DeploymentTarget {
            module: "CarRegistrationSystem".to_string(),
            contract: "CarRegistrationSystem".to_string(),
            from: AccountRef(19),
            constructor_args: vec![json!(VIN), json!("")],
        });
        builder
            .register_duty(DutyLabel::Registration, price)
            .associate_duty(VIN, DutyLabel::Registration)
            .attach_insurance_policy(VIN, "АА", "11")
            .attach_registration_interval(VIN, 0, 1587795681);
        builder.build().unwrap()
    }

    /// 在第 N 次提交時失敗
    struct FailingClient {
        inner: InMemoryLedger,
        fail_at: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContractClient for FailingClient {
        async fn deploy(&self, request: &DeployRequest) -> Result<DeployReceipt> {
            self.inner.deploy(request).await
        }

        async fn submit(&self, address: &ContractAddress, call: &ContractCall) -> Result<TxReceipt> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(RegistryError::RpcError {
                    code: -32000,
                    message: "node unavailable".to_string(),
                });
            }
            self.inner.submit(address, call).await
        }
    }

    #[tokio::test]
    async fn test_run_submits_every_call_once() {
        let runner = ManifestRunner::new(InMemoryLedger::new(), MemoryJournal::new());
        let manifest = manifest_with_price("0.5");

        let report = runner.run(&manifest, None).await.unwrap();

        assert!(report.deployed);
        assert_eq!(report.submitted.len(), manifest.len() + 1);
        assert!(report.skipped.is_empty());
        assert_eq!(runner.journal().len(), manifest.len() + 1);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let runner = ManifestRunner::new(ledger.clone(), MemoryJournal::new());
        let manifest = manifest_with_price("0.5");

        let first = runner.run(&manifest, None).await.unwrap();
        let second = runner.run(&manifest, None).await.unwrap();

        assert_eq!(first.address, second.address);
        assert!(!second.deployed);
        assert!(second.submitted.is_empty());
        assert_eq!(second.skipped.len(), manifest.len() + 1);

        let policies = ledger
            .read(&first.address, "getInsurancePolicies", &[json!(VIN)])
            .await
            .unwrap();
        assert_eq!(policies.as_array().unwrap().len(), 1);
        assert_eq!(ledger.contract_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_aborts_and_resume_continues() {
        let ledger = InMemoryLedger::new();
        let journal = MemoryJournal::new();
        let manifest = manifest_with_price("0.5");

        let failing = ManifestRunner::new(
            FailingClient {
                inner: ledger.clone(),
                fail_at: 2,
                calls: AtomicUsize::new(0),
            },
            journal.clone(),
        );
        let err = failing.run(&manifest, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::RpcError { .. }));
        // 部署加上前兩筆呼叫
        assert_eq!(journal.len(), 3);

        let resumed = ManifestRunner::new(ledger.clone(), journal.clone());
        let report = resumed.run(&manifest, None).await.unwrap();
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.submitted.len(), manifest.len() + 1 - 3);
        assert_eq!(journal.len(), manifest.len() + 1);
    }

    #[tokio::test]
    async fn test_changed_manifest_fails_reconciliation() {
        let runner = ManifestRunner::new(InMemoryLedger::new(), MemoryJournal::new());

        runner.run(&manifest_with_price("0.5"), None).await.unwrap();
        let err = runner
            .run(&manifest_with_price("0.75"), None)
            .await
            .unwrap_err();

        assert!(
            matches!(err, RegistryError::ReconciliationError { ref call_id, .. } if call_id == "duty0")
        );
    }

    #[test]
    fn test_report_summary() {
        let report = RunReport {
            address: ContractAddress::parse("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap(),
            deployed: true,
            submitted: vec![CallId::new("duty0"), CallId::new("carDuty0")],
            skipped: vec![],
            duration: Duration::from_millis(120),
        };

        let summary = report.summary();
        assert_eq!(summary.get("submitted").unwrap(), &Value::Number(2.into()));
        assert_eq!(summary.get("skipped").unwrap(), &Value::Number(0.into()));
        assert_eq!(summary.get("duration_ms").unwrap(), &Value::Number(120.into()));
    }
}
