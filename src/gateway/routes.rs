use crate::core::units::format_ether;
use crate::domain::model::{
    Bound, ContractAddress, DutyLabel, InsurancePolicy, RegistrationInterval, VehiclePassport, Wei,
};
use crate::gateway::abi::{parse_functions, AbiFunction};
use crate::utils::error::{RegistryError, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// 資源的查詢範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `/<name>`
    Contract,
    /// `/vehicles/:vin/<name>`
    Vehicle,
}

/// 靜態宣告的資源：名稱 -> 合約查詢函式 -> 解碼
#[derive(Clone, Copy)]
pub struct ResourceRoute {
    pub name: &'static str,
    pub method: &'static str,
    pub scope: Scope,
    pub decode: fn(&str, Value) -> Result<Value>,
}

pub static RESOURCES: [ResourceRoute; 5] = [
    ResourceRoute {
        name: "duties",
        method: "getDuties",
        scope: Scope::Contract,
        decode: decode_duties,
    },
    ResourceRoute {
        name: "car-duties",
        method: "getCarDuties",
        scope: Scope::Vehicle,
        decode: decode_car_duties,
    },
    ResourceRoute {
        name: "insurance-policies",
        method: "getInsurancePolicies",
        scope: Scope::Vehicle,
        decode: decode_insurance_policies,
    },
    ResourceRoute {
        name: "passports",
        method: "getPassports",
        scope: Scope::Vehicle,
        decode: decode_passports,
    },
    ResourceRoute {
        name: "registration-dates",
        method: "getRegistrationDates",
        scope: Scope::Vehicle,
        decode: decode_registration_dates,
    },
];

/// 啟動時建立一次的路由表
#[derive(Debug, Clone)]
pub struct RouteTable {
    address: ContractAddress,
    abi: Vec<Value>,
    functions: BTreeMap<String, AbiFunction>,
}

impl RouteTable {
    /// 驗證位址與介面描述；任何缺漏都讓啟動失敗
    pub fn build(address: &str, abi: Vec<Value>) -> Result<Self> {
        let address = ContractAddress::parse(address)
            .map_err(|message| RegistryError::InterfaceError { message })?;

        if abi.is_empty() {
            return Err(RegistryError::InterfaceError {
                message: "interface description is empty".to_string(),
            });
        }

        let mut functions = BTreeMap::new();
        for function in parse_functions(&abi)? {
            if !function.is_readable() {
                continue;
            }
            if functions.contains_key(&function.name) {
                tracing::warn!("⚠️ Ignoring overloaded read function {}", function.signature());
                continue;
            }
            functions.insert(function.name.clone(), function);
        }

        if functions.is_empty() {
            return Err(RegistryError::InterfaceError {
                message: "interface description has no view or pure functions".to_string(),
            });
        }

        for resource in &RESOURCES {
            let function = functions.get(resource.method).ok_or_else(|| {
                RegistryError::InterfaceError {
                    message: format!(
                        "resource '{}' needs read function '{}'",
                        resource.name, resource.method
                    ),
                }
            })?;

            let expected_inputs: &[&str] = match resource.scope {
                Scope::Contract => &[],
                Scope::Vehicle => &["string"],
            };
            let actual_inputs: Vec<&str> = function.inputs.iter().map(|p| p.kind.as_str()).collect();
            if actual_inputs != expected_inputs {
                return Err(RegistryError::InterfaceError {
                    message: format!(
                        "resource '{}' expects {}({}), found {}",
                        resource.name,
                        resource.method,
                        expected_inputs.join(","),
                        function.signature()
                    ),
                });
            }
        }

        tracing::debug!(
            "🗺️ Route table built for {} ({} read functions)",
            address,
            functions.len()
        );

        Ok(Self {
            address,
            abi,
            functions,
        })
    }

    pub fn address(&self) -> &ContractAddress {
        &self.address
    }

    pub fn abi(&self) -> &[Value] {
        &self.abi
    }

    pub fn functions(&self) -> impl Iterator<Item = &AbiFunction> {
        self.functions.values()
    }

    pub fn function(&self, name: &str) -> Option<&AbiFunction> {
        self.functions.get(name)
    }

    pub fn resource(&self, name: &str, scope: Scope) -> Option<&'static ResourceRoute> {
        RESOURCES.iter().find(|r| r.name == name && r.scope == scope)
    }

    pub fn resources(&self) -> &'static [ResourceRoute] {
        &RESOURCES
    }
}

fn unexpected(method: &str, raw: &Value) -> RegistryError {
    RegistryError::InterfaceError {
        message: format!("unexpected output from {}: {}", method, raw),
    }
}

fn as_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_label(value: &Value) -> Option<DutyLabel> {
    as_u128(value)
        .and_then(|i| u8::try_from(i).ok())
        .and_then(DutyLabel::from_index)
}

fn as_array<'a>(method: &str, raw: &'a Value) -> Result<&'a Vec<Value>> {
    raw.as_array().ok_or_else(|| unexpected(method, raw))
}

fn decode_duties(_vin: &str, raw: Value) -> Result<Value> {
    let mut duties = Vec::new();
    for item in as_array("getDuties", &raw)? {
        let label = item
            .get("dutyType")
            .and_then(as_label)
            .ok_or_else(|| unexpected("getDuties", item))?;
        let amount = item
            .get("amount")
            .and_then(as_u128)
            .map(Wei)
            .ok_or_else(|| unexpected("getDuties", item))?;
        duties.push(json!({
            "label": label,
            "amount_wei": amount,
            "amount": format_ether(amount),
        }));
    }
    Ok(Value::Array(duties))
}

fn decode_car_duties(vin: &str, raw: Value) -> Result<Value> {
    let labels = as_array("getCarDuties", &raw)?
        .iter()
        .map(|item| as_label(item).ok_or_else(|| unexpected("getCarDuties", item)))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "vin": vin, "duties": labels }))
}

#[derive(Deserialize)]
struct PolicyRow {
    series: String,
    number: String,
}

#[derive(Deserialize)]
struct PassportRow {
    region: String,
    series: String,
    number: String,
}

fn decode_insurance_policies(vin: &str, raw: Value) -> Result<Value> {
    let rows: Vec<PolicyRow> =
        serde_json::from_value(raw.clone()).map_err(|_| unexpected("getInsurancePolicies", &raw))?;
    let policies: Vec<InsurancePolicy> = rows
        .into_iter()
        .map(|row| InsurancePolicy {
            vin: vin.to_string(),
            series: row.series,
            number: row.number,
        })
        .collect();
    Ok(serde_json::to_value(policies)?)
}

fn decode_passports(vin: &str, raw: Value) -> Result<Value> {
    let rows: Vec<PassportRow> =
        serde_json::from_value(raw.clone()).map_err(|_| unexpected("getPassports", &raw))?;
    let passports: Vec<VehiclePassport> = rows
        .into_iter()
        .map(|row| VehiclePassport {
            vin: vin.to_string(),
            region: row.region,
            series: row.series,
            number: row.number,
        })
        .collect();
    Ok(serde_json::to_value(passports)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundView {
    Unbounded,
    At {
        timestamp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        utc: Option<String>,
    },
}

impl From<Bound> for BoundView {
    fn from(bound: Bound) -> Self {
        match bound {
            Bound::Unbounded => BoundView::Unbounded,
            Bound::At(timestamp) => BoundView::At {
                timestamp,
                utc: i64::try_from(timestamp)
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .map(|dt| dt.to_rfc3339()),
            },
        }
    }
}

/// 依起始時間排序，無起始限制者最前
fn decode_registration_dates(vin: &str, raw: Value) -> Result<Value> {
    let mut intervals = as_array("getRegistrationDates", &raw)?
        .iter()
        .map(|item| {
            let start = item.get("start").and_then(as_u128);
            let end = item.get("end").and_then(as_u128);
            match (start, end) {
                (Some(start), Some(end)) => Ok(RegistrationInterval {
                    vin: vin.to_string(),
                    start: u64::try_from(start).map_err(|_| unexpected("getRegistrationDates", item))?,
                    end: u64::try_from(end).map_err(|_| unexpected("getRegistrationDates", item))?,
                }),
                _ => Err(unexpected("getRegistrationDates", item)),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    intervals.sort_by_key(|interval| interval.start);

    let views: Vec<Value> = intervals
        .iter()
        .map(|interval| {
            json!({
                "vin": interval.vin,
                "start": BoundView::from(interval.start_bound()),
                "end": BoundView::from(interval.end_bound()),
            })
        })
        .collect();
    Ok(Value::Array(views))
}
