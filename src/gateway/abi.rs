use crate::domain::model::ContractAddress;
use crate::utils::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    Nonpayable,
    Payable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: StateMutability,
    // 舊版編譯器只輸出 constant
    #[serde(default, skip_serializing)]
    pub constant: bool,
}

impl AbiFunction {
    pub fn is_readable(&self) -> bool {
        self.constant
            || matches!(
                self.state_mutability,
                StateMutability::View | StateMutability::Pure
            )
    }

    pub fn signature(&self) -> String {
        let inputs: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, inputs.join(","))
    }
}

/// 取出介面描述中的所有函式；缺少 `type` 時依慣例視為函式
pub fn parse_functions(abi: &[Value]) -> Result<Vec<AbiFunction>> {
    let mut functions = Vec::new();

    for (index, item) in abi.iter().enumerate() {
        let kind = item.get("type").and_then(Value::as_str).unwrap_or("function");
        if kind != "function" {
            continue;
        }
        let function: AbiFunction =
            serde_json::from_value(item.clone()).map_err(|e| RegistryError::InterfaceError {
                message: format!("ABI entry #{} is malformed: {}", index, e),
            })?;
        functions.push(function);
    }

    Ok(functions)
}

impl AbiParam {
    /// 依 ABI 型別把查詢字串轉成 JSON 值
    pub fn coerce(&self, raw: &str) -> std::result::Result<Value, String> {
        let kind = self.kind.as_str();

        if kind.ends_with(']') || kind.starts_with("tuple") {
            return serde_json::from_str(raw)
                .map_err(|e| format!("expected JSON for {} '{}': {}", kind, self.name, e));
        }

        match kind {
            "string" => Ok(Value::String(raw.to_string())),
            "bool" => match raw {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("expected bool for '{}', got '{}'", self.name, raw)),
            },
            "address" => ContractAddress::parse(raw).map(|a| Value::String(a.to_string())),
            k if k.starts_with("uint") => {
                if let Ok(n) = raw.parse::<u64>() {
                    Ok(Value::from(n))
                } else {
                    raw.parse::<u128>()
                        .map(|n| Value::String(n.to_string()))
                        .map_err(|_| format!("expected {} for '{}', got '{}'", k, self.name, raw))
                }
            }
            k if k.starts_with("int") => {
                if let Ok(n) = raw.parse::<i64>() {
                    Ok(Value::from(n))
                } else {
                    raw.parse::<i128>()
                        .map(|n| Value::String(n.to_string()))
                        .map_err(|_| format!("expected {} for '{}', got '{}'", k, self.name, raw))
                }
            }
            k if k.starts_with("bytes") => {
                let hex = raw
                    .strip_prefix("0x")
                    .ok_or_else(|| format!("expected 0x-prefixed hex for '{}'", self.name))?;
                if hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(format!("invalid hex for '{}': '{}'", self.name, raw))
                }
            }
            other => Err(format!("unsupported ABI type '{}'", other)),
        }
    }
}
