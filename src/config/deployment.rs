use crate::adapters::journal::JOURNAL_FILE;
use crate::domain::model::{CallId, ContractAddress};
use crate::utils::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEPLOYED_ADDRESSES_FILE: &str = "deployed_addresses.json";
pub const ARTIFACTS_DIR: &str = "artifacts";

/// 編譯產物：閘道只需要 ABI，部署時可能需要 bytecode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractArtifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: String,
    pub abi: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
}

/// 部署目錄：位址表、產物與執行日誌
#[derive(Debug, Clone)]
pub struct DeploymentArtifacts {
    dir: PathBuf,
}

impl DeploymentArtifacts {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    pub fn deployed_addresses_path(&self) -> PathBuf {
        self.dir.join(DEPLOYED_ADDRESSES_FILE)
    }

    pub fn artifact_path(&self, future_id: &CallId) -> PathBuf {
        self.dir
            .join(ARTIFACTS_DIR)
            .join(format!("{}.json", future_id))
    }

    fn read_addresses(&self) -> Result<BTreeMap<String, String>> {
        let path = self.deployed_addresses_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| RegistryError::InterfaceError {
            message: format!("{} is malformed: {}", path.display(), e),
        })
    }

    /// 讀取已部署位址；缺少或格式錯誤都視為致命錯誤
    pub fn deployed_address(&self, future_id: &CallId) -> Result<ContractAddress> {
        let path = self.deployed_addresses_path();
        if !path.exists() {
            return Err(RegistryError::InterfaceError {
                message: format!("{} not found", path.display()),
            });
        }

        let addresses = self.read_addresses()?;
        let raw = addresses
            .get(future_id.as_str())
            .ok_or_else(|| RegistryError::InterfaceError {
                message: format!("no address recorded for {} in {}", future_id, path.display()),
            })?;

        ContractAddress::parse(raw).map_err(|message| RegistryError::InterfaceError { message })
    }

    pub fn record_deployed_address(
        &self,
        future_id: &CallId,
        address: &ContractAddress,
    ) -> Result<()> {
        let mut addresses = self.read_addresses()?;
        addresses.insert(future_id.to_string(), address.to_string());

        fs::create_dir_all(&self.dir)?;
        fs::write(
            self.deployed_addresses_path(),
            serde_json::to_string_pretty(&addresses)?,
        )?;
        tracing::debug!("📝 Recorded {} -> {}", future_id, address);
        Ok(())
    }

    pub fn load_artifact(&self, future_id: &CallId) -> Result<ContractArtifact> {
        let path = self.artifact_path(future_id);
        let content = fs::read_to_string(&path).map_err(|e| RegistryError::InterfaceError {
            message: format!("cannot read artifact {}: {}", path.display(), e),
        })?;

        serde_json::from_str(&content).map_err(|e| RegistryError::InterfaceError {
            message: format!("artifact {} is malformed: {}", path.display(), e),
        })
    }

    /// 部署用 bytecode；產物不存在時為 None，格式錯誤則中止
    pub fn bytecode(&self, future_id: &CallId) -> Result<Option<String>> {
        if !self.artifact_path(future_id).exists() {
            return Ok(None);
        }
        Ok(self.load_artifact(future_id)?.bytecode)
    }

    /// 只在產物不存在時寫入，不覆蓋編譯工具產生的檔案
    pub fn write_artifact_if_missing(
        &self,
        future_id: &CallId,
        artifact: &ContractArtifact,
    ) -> Result<bool> {
        let path = self.artifact_path(future_id);
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(artifact)?)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn future_id() -> CallId {
        CallId::new("CarRegistrationSystem#CarRegistrationSystem")
    }

    #[test]
    fn test_record_and_read_address() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = DeploymentArtifacts::new(temp_dir.path().join("chain-31337"));
        let address = ContractAddress::parse("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap();

        artifacts.record_deployed_address(&future_id(), &address).unwrap();
        assert_eq!(artifacts.deployed_address(&future_id()).unwrap(), address);

        let raw = fs::read_to_string(artifacts.deployed_addresses_path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            parsed["CarRegistrationSystem#CarRegistrationSystem"],
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
    }

    #[test]
    fn test_missing_or_malformed_address_fails() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = DeploymentArtifacts::new(temp_dir.path());
        assert!(artifacts.deployed_address(&future_id()).is_err());

        fs::write(
            artifacts.deployed_addresses_path(),
            r#"{"CarRegistrationSystem#CarRegistrationSystem": "0x1234"}"#,
        )
        .unwrap();
        assert!(matches!(
            artifacts.deployed_address(&future_id()),
            Err(RegistryError::InterfaceError { .. })
        ));
    }

    #[test]
    fn test_artifact_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = DeploymentArtifacts::new(temp_dir.path());
        let artifact = ContractArtifact {
            contract_name: "CarRegistrationSystem".to_string(),
            abi: vec![json!({"type": "function", "name": "vin", "stateMutability": "view", "inputs": [], "outputs": []})],
            bytecode: None,
        };

        assert!(artifacts.write_artifact_if_missing(&future_id(), &artifact).unwrap());
        assert!(!artifacts.write_artifact_if_missing(&future_id(), &artifact).unwrap());

        let loaded = artifacts.load_artifact(&future_id()).unwrap();
        assert_eq!(loaded.contract_name, "CarRegistrationSystem");
        assert_eq!(loaded.abi.len(), 1);
    }

    #[test]
    fn test_bytecode_requires_well_formed_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = DeploymentArtifacts::new(temp_dir.path());
        assert_eq!(artifacts.bytecode(&future_id()).unwrap(), None);

        let path = artifacts.artifact_path(&future_id());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            artifacts.bytecode(&future_id()),
            Err(RegistryError::InterfaceError { .. })
        ));

        fs::write(
            &path,
            r#"{"contractName": "CarRegistrationSystem", "abi": [], "bytecode": "0x6080"}"#,
        )
        .unwrap();
        assert_eq!(
            artifacts.bytecode(&future_id()).unwrap(),
            Some("0x6080".to_string())
        );
    }
}
