use crate::utils::error::{RegistryError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 節點 JSON-RPC 端點：必須是帶主機名稱的 http(s) 位址
pub fn validate_rpc_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "RPC endpoint cannot be empty"));
    }

    // 環境變數未設定時，替換後仍保留 ${VAR}
    if url_str.contains("${") {
        return Err(invalid(
            field_name,
            url_str,
            "RPC endpoint references an environment variable that is not set",
        ));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("not a valid endpoint URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid(
                field_name,
                url_str,
                format!("JSON-RPC is sent over HTTP; scheme '{}' is not supported", scheme),
            ))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field_name, url_str, "RPC endpoint has no host"));
    }
    if url.fragment().is_some() {
        return Err(invalid(field_name, url_str, "RPC endpoint cannot carry a #fragment"));
    }

    Ok(())
}

/// 部署目錄可以尚未建立，但不能是既有的檔案
pub fn validate_deployment_dir(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "deployment directory cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "deployment directory contains null bytes"));
    }
    if Path::new(path).is_file() {
        return Err(invalid(
            field_name,
            path,
            "points at a file; journal and artifacts need a directory",
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_rpc_url() {
        assert!(validate_rpc_url("network.rpc_url", "http://127.0.0.1:8545").is_ok());
        assert!(validate_rpc_url("network.rpc_url", "https://rpc.example.com/v3?key=abc").is_ok());
        assert!(validate_rpc_url("network.rpc_url", "").is_err());
        assert!(validate_rpc_url("network.rpc_url", "invalid-url").is_err());
        assert!(validate_rpc_url("network.rpc_url", "ws://127.0.0.1:8545").is_err());
        assert!(validate_rpc_url("network.rpc_url", "http://127.0.0.1:8545/#main").is_err());
    }

    #[test]
    fn test_unresolved_env_var_is_reported() {
        match validate_rpc_url("network.rpc_url", "${CAR_REGISTRY_RPC_URL}") {
            Err(RegistryError::InvalidConfigValueError { reason, .. }) => {
                assert!(reason.contains("environment variable"));
            }
            other => panic!("expected invalid value error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_deployment_dir() {
        assert!(validate_deployment_dir("deployment.directory", "ignition/deployments/chain-31337").is_ok());
        assert!(validate_deployment_dir("deployment.directory", " ").is_err());

        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy();
        assert!(validate_deployment_dir("deployment.directory", &path).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("vehicle.vin", "4S4BRDSC2D2221585").is_ok());
        assert!(validate_non_empty_string("vehicle.vin", "   ").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("network.timeout_seconds", 30, 1, 600).is_ok());
        assert!(validate_range("network.timeout_seconds", 0, 1, 600).is_err());
    }
}
