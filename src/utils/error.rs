use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown duty label: {label}")]
    UnknownDutyLabel { label: String },

    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Duplicate call identifier in manifest: {call_id}")]
    DuplicateCallId { call_id: String },

    #[error("Journal entry '{call_id}' does not match the manifest: {reason}")]
    ReconciliationError { call_id: String, reason: String },

    #[error("Journal corrupted at line {line}: {message}")]
    JournalCorrupted { line: usize, message: String },

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("Contract reverted in '{method}': {reason}")]
    ContractRevert { method: String, reason: String },

    #[error("Contract interface error: {message}")]
    InterfaceError { message: String },

    #[error("Gateway error: {message}")]
    GatewayError { message: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Contract,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RegistryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::ConfigValidationError { .. }
            | RegistryError::InvalidConfigValueError { .. }
            | RegistryError::MissingConfigError { .. }
            | RegistryError::UnknownDutyLabel { .. }
            | RegistryError::InvalidAmount { .. }
            | RegistryError::DuplicateCallId { .. } => ErrorCategory::Configuration,
            RegistryError::HttpError(_) | RegistryError::RpcError { .. } => ErrorCategory::Network,
            RegistryError::SerializationError(_)
            | RegistryError::ReconciliationError { .. }
            | RegistryError::JournalCorrupted { .. } => ErrorCategory::Data,
            RegistryError::ContractRevert { .. } | RegistryError::InterfaceError { .. } => {
                ErrorCategory::Contract
            }
            RegistryError::IoError(_) | RegistryError::GatewayError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 重新執行即可恢復
            RegistryError::HttpError(_) | RegistryError::RpcError { .. } => ErrorSeverity::Medium,
            RegistryError::JournalCorrupted { .. }
            | RegistryError::ReconciliationError { .. }
            | RegistryError::IoError(_)
            | RegistryError::GatewayError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RegistryError::ConfigValidationError { .. }
            | RegistryError::InvalidConfigValueError { .. }
            | RegistryError::MissingConfigError { .. } => {
                "Check the manifest TOML file against the documented sections"
            }
            RegistryError::UnknownDutyLabel { .. } => {
                "Use one of: registration, license_plates, registration_certificate, vehicle_passport, technical_inspection"
            }
            RegistryError::InvalidAmount { .. } => {
                "Write prices as plain decimal strings with at most 18 fractional digits"
            }
            RegistryError::DuplicateCallId { .. } => {
                "Every manifest entry needs its own call identifier"
            }
            RegistryError::ReconciliationError { .. } => {
                "The manifest changed since the last run; restore it or start a fresh deployment directory"
            }
            RegistryError::JournalCorrupted { .. } => {
                "Inspect journal.jsonl in the deployment directory and remove the broken line"
            }
            RegistryError::HttpError(_) | RegistryError::RpcError { .. } => {
                "Make sure the node is reachable and re-run; completed calls are skipped"
            }
            RegistryError::ContractRevert { .. } => {
                "Check the calling account and the order of manifest entries"
            }
            RegistryError::InterfaceError { .. } => {
                "Check deployed_addresses.json and the contract artifact in the deployment directory"
            }
            RegistryError::SerializationError(_) => "Check that the JSON files are well-formed",
            RegistryError::IoError(_) => "Check file paths and permissions",
            RegistryError::GatewayError { .. } => "Check that the port is free and the host is valid",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach the deployment target: {}", self),
            ErrorCategory::Data => format!("Deployment records are inconsistent: {}", self),
            ErrorCategory::Contract => format!("Contract problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度決定的程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}
