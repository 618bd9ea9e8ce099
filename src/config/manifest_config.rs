use crate::core::manifest::{DeploymentTarget, Manifest, ManifestBuilder};
use crate::core::units::parse_ether;
use crate::domain::model::{AccountRef, CallId, DutyLabel};
use crate::utils::error::{RegistryError, Result};
use crate::utils::validation::{
    validate_deployment_dir, validate_non_empty_string, validate_range, validate_rpc_url, Validate,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODULE: &str = "CarRegistrationSystem";
pub const DEFAULT_CHAIN_ID: u64 = 31337;
pub const DEFAULT_OWNER_ACCOUNT: u32 = 19;
pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
pub const DEFAULT_GATEWAY_HOST: &str = "127.0.0.1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

fn default_owner_account() -> u32 {
    DEFAULT_OWNER_ACCOUNT
}

/// 預設部署目錄，與部署工具的 chain 目錄結構一致
pub fn default_deployment_dir(chain_id: u64) -> String {
    format!("ignition/deployments/chain-{}", chain_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub deployment: DeploymentConfig,
    pub network: Option<NetworkConfig>,
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub duties: BTreeMap<String, String>, // 規費名稱 -> 十進位價格
    #[serde(default)]
    pub insurance_policies: Vec<InsurancePolicyConfig>,
    #[serde(default)]
    pub passports: Vec<PassportConfig>,
    #[serde(default)]
    pub registration_dates: Vec<RegistrationDateConfig>,
    pub gateway: Option<GatewayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_module")]
    pub contract: String,
    #[serde(default = "default_owner_account")]
    pub from_account: u32,
    pub owner_name: Option<String>, // 建構子第二個參數
    pub directory: Option<String>,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub vin: String,
    #[serde(default)]
    pub duties: Vec<String>, // 要與車輛關聯的規費
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePolicyConfig {
    pub vin: Option<String>,
    pub series: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassportConfig {
    pub vin: Option<String>,
    pub region: String,
    pub series: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationDateConfig {
    pub vin: Option<String>,
    #[serde(default)]
    pub start: u64, // 0 = 無起始限制
    #[serde(default)]
    pub end: u64, // 0 = 無結束限制
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ManifestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RegistryError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RegistryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RPC_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RegistryError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 命令列覆蓋設定
    pub fn apply_overrides(&mut self, rpc_url: Option<String>, deployment_dir: Option<String>) {
        if let Some(rpc_url) = rpc_url {
            match self.network.as_mut() {
                Some(network) => network.rpc_url = rpc_url,
                None => {
                    self.network = Some(NetworkConfig {
                        rpc_url,
                        timeout_seconds: None,
                    })
                }
            }
        }
        if let Some(directory) = deployment_dir {
            self.deployment.directory = Some(directory);
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("deployment.module", &self.deployment.module)?;
        validate_non_empty_string("deployment.contract", &self.deployment.contract)?;
        validate_deployment_dir(
            "deployment.directory",
            &self.deployment_dir().to_string_lossy(),
        )?;

        if let Some(network) = &self.network {
            validate_rpc_url("network.rpc_url", &network.rpc_url)?;
            if let Some(timeout) = network.timeout_seconds {
                validate_range("network.timeout_seconds", timeout, 1, 600)?;
            }
        }

        validate_non_empty_string("vehicle.vin", &self.vehicle.vin)?;

        // 大小寫或分隔符不同的鍵會解析成同一個規費
        let mut seen: BTreeMap<DutyLabel, &str> = BTreeMap::new();
        for (key, price) in &self.duties {
            let label = parse_label("duties", key)?;
            parse_ether(price)?;
            if let Some(previous) = seen.insert(label, key) {
                return Err(RegistryError::ConfigValidationError {
                    field: "duties".to_string(),
                    message: format!(
                        "keys '{}' and '{}' both name duty '{}'",
                        previous, key, label
                    ),
                });
            }
        }
        for label in &self.vehicle.duties {
            parse_label("vehicle.duties", label)?;
        }

        for policy in &self.insurance_policies {
            validate_non_empty_string("insurance_policies.series", &policy.series)?;
            validate_non_empty_string("insurance_policies.number", &policy.number)?;
        }
        for passport in &self.passports {
            validate_non_empty_string("passports.region", &passport.region)?;
            validate_non_empty_string("passports.series", &passport.series)?;
            validate_non_empty_string("passports.number", &passport.number)?;
        }
        for interval in &self.registration_dates {
            if interval.start != 0 && interval.end != 0 && interval.start > interval.end {
                return Err(RegistryError::InvalidConfigValueError {
                    field: "registration_dates".to_string(),
                    value: format!("{}..{}", interval.start, interval.end),
                    reason: "start must not be after end".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn deployment_target(&self) -> DeploymentTarget {
        DeploymentTarget {
            module: self.deployment.module.clone(),
            contract: self.deployment.contract.clone(),
            from: AccountRef(self.deployment.from_account),
            constructor_args: vec![
                json!(self.vehicle.vin),
                json!(self.deployment.owner_name.clone().unwrap_or_default()),
            ],
        }
    }

    /// 轉換為執行清單；未知的規費名稱在此被拒絕
    pub fn to_manifest(&self) -> Result<Manifest> {
        let vin = self.vehicle.vin.as_str();
        let mut builder = ManifestBuilder::new(self.deployment_target());

        let mut duties = self
            .duties
            .iter()
            .map(|(label, price)| Ok((parse_label("duties", label)?, price.as_str())))
            .collect::<Result<Vec<_>>>()?;
        duties.sort_by_key(|(label, _)| *label);
        for (label, price) in duties {
            builder.register_duty(label, price);
        }

        for label in &self.vehicle.duties {
            builder.associate_duty(vin, parse_label("vehicle.duties", label)?);
        }

        for policy in &self.insurance_policies {
            builder.attach_insurance_policy(
                policy.vin.as_deref().unwrap_or(vin),
                &policy.series,
                &policy.number,
            );
        }

        for passport in &self.passports {
            builder.attach_passport(
                passport.vin.as_deref().unwrap_or(vin),
                &passport.region,
                &passport.series,
                &passport.number,
            );
        }

        for interval in &self.registration_dates {
            builder.attach_registration_interval(
                interval.vin.as_deref().unwrap_or(vin),
                interval.start,
                interval.end,
            );
        }

        builder.build()
    }

    pub fn future_id(&self) -> CallId {
        self.deployment_target().future_id()
    }

    pub fn chain_id(&self) -> u64 {
        self.deployment.chain_id.unwrap_or(DEFAULT_CHAIN_ID)
    }

    pub fn deployment_dir(&self) -> PathBuf {
        PathBuf::from(
            self.deployment
                .directory
                .clone()
                .unwrap_or_else(|| default_deployment_dir(self.chain_id())),
        )
    }

    pub fn rpc_url(&self) -> Option<&str> {
        self.network.as_ref().map(|n| n.rpc_url.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.network
                .as_ref()
                .and_then(|n| n.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    pub fn gateway_host(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.host.clone())
            .unwrap_or_else(|| DEFAULT_GATEWAY_HOST.to_string())
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway
            .as_ref()
            .and_then(|g| g.port)
            .unwrap_or(DEFAULT_GATEWAY_PORT)
    }
}

fn parse_label(field: &str, raw: &str) -> Result<DutyLabel> {
    raw.parse::<DutyLabel>().map_err(|label| {
        tracing::debug!("Rejected duty label '{}' in {}", label, field);
        RegistryError::UnknownDutyLabel { label }
    })
}

impl Validate for ManifestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
