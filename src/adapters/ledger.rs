use crate::domain::model::{
    AccountRef, CarDuty, ContractAddress, Duty, DutyLabel, InsurancePolicy, RegistrationInterval,
    VehiclePassport, Wei,
};
use crate::domain::ports::{
    ContractCall, ContractClient, ContractReader, DeployReceipt, DeployRequest, TxReceipt,
};
use crate::utils::error::{RegistryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub const CONTRACT_NAME: &str = "CarRegistrationSystem";

const CONTRACT_ABI: &str = include_str!("abi/CarRegistrationSystem.json");

const READ_METHODS: [&str; 8] = [
    "vin",
    "owner",
    "getDuty",
    "getDuties",
    "getCarDuties",
    "getInsurancePolicies",
    "getPassports",
    "getRegistrationDates",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    contracts: BTreeMap<String, ContractState>,
    nonce: u64,
    tx_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContractState {
    owner: AccountRef,
    vin: String,
    owner_name: String,
    duties: Vec<Duty>,
    car_duties: Vec<CarDuty>,
    insurance_policies: Vec<InsurancePolicy>,
    passports: Vec<VehiclePassport>,
    registration_dates: Vec<RegistrationInterval>,
}

/// 本地帳本：代替遠端節點保存合約狀態，可存成 JSON 快照
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 讀取快照；檔案不存在時回傳空帳本
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No ledger snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let state: LedgerState = serde_json::from_str(&content)?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&*self.lock())?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 合約介面描述 (ABI)
    pub fn interface() -> Result<Vec<Value>> {
        Ok(serde_json::from_str(CONTRACT_ABI)?)
    }

    pub fn contract_count(&self) -> usize {
        self.lock().contracts.len()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn revert(method: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::ContractRevert {
        method: method.to_string(),
        reason: reason.into(),
    }
}

fn arg<'a>(method: &str, args: &'a [Value], index: usize) -> Result<&'a Value> {
    args.get(index)
        .ok_or_else(|| revert(method, format!("missing argument #{}", index)))
}

fn arg_str(method: &str, args: &[Value], index: usize) -> Result<String> {
    match arg(method, args, index)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(revert(
            method,
            format!("argument #{} must be a string, got {}", index, other),
        )),
    }
}

fn arg_u128(method: &str, args: &[Value], index: usize) -> Result<u128> {
    let value = arg(method, args, index)?;
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.parse::<u128>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        revert(
            method,
            format!("argument #{} must be an unsigned integer, got {}", index, value),
        )
    })
}

fn arg_u64(method: &str, args: &[Value], index: usize) -> Result<u64> {
    let value = arg_u128(method, args, index)?;
    u64::try_from(value)
        .map_err(|_| revert(method, format!("argument #{} does not fit into 64 bits", index)))
}

fn arg_label(method: &str, args: &[Value], index: usize) -> Result<DutyLabel> {
    let value = arg(method, args, index)?;
    let label = match value {
        Value::String(s) => s
            .parse::<u8>()
            .ok()
            .and_then(DutyLabel::from_index)
            .or_else(|| s.parse::<DutyLabel>().ok()),
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| u8::try_from(i).ok())
            .and_then(DutyLabel::from_index),
        _ => None,
    };
    label.ok_or_else(|| revert(method, format!("invalid duty type {}", value)))
}

impl ContractState {
    fn apply(&mut self, call: &ContractCall) -> Result<()> {
        let method = call.method.as_str();
        let args = &call.args;

        if call.from != self.owner {
            return Err(revert(method, format!("caller {} is not the owner", call.from)));
        }

        match method {
            "addDuty" => {
                let label = arg_label(method, args, 0)?;
                let amount = Wei(arg_u128(method, args, 1)?);
                match self.duties.iter_mut().find(|d| d.label == label) {
                    Some(duty) => duty.amount = amount,
                    None => self.duties.push(Duty { label, amount }),
                }
            }
            "addCarDuty" => {
                let vin = arg_str(method, args, 0)?;
                let label = arg_label(method, args, 1)?;
                if !self.duties.iter().any(|d| d.label == label) {
                    return Err(revert(method, format!("duty {} is not registered", label)));
                }
                self.car_duties.push(CarDuty { vin, label });
            }
            "addInsurancePolicy" => {
                self.insurance_policies.push(InsurancePolicy {
                    vin: arg_str(method, args, 0)?,
                    series: arg_str(method, args, 1)?,
                    number: arg_str(method, args, 2)?,
                });
            }
            "addPassport" => {
                self.passports.push(VehiclePassport {
                    vin: arg_str(method, args, 0)?,
                    region: arg_str(method, args, 1)?,
                    series: arg_str(method, args, 2)?,
                    number: arg_str(method, args, 3)?,
                });
            }
            "addRegistrationDate" => {
                self.registration_dates.push(RegistrationInterval {
                    vin: arg_str(method, args, 0)?,
                    start: arg_u64(method, args, 1)?,
                    end: arg_u64(method, args, 2)?,
                });
            }
            _ => return Err(revert(method, "unknown method")),
        }

        Ok(())
    }

    fn query(&self, method: &str, args: &[Value]) -> Result<Value> {
        let value = match method {
            "vin" => json!(self.vin),
            "owner" => json!(self.owner.local_address()),
            "getDuty" => {
                let label = arg_label(method, args, 0)?;
                let amount = self
                    .duties
                    .iter()
                    .find(|d| d.label == label)
                    .map(|d| d.amount)
                    .unwrap_or_default();
                json!(amount.to_string())
            }
            "getDuties" => Value::Array(
                self.duties
                    .iter()
                    .map(|d| json!({ "dutyType": d.label.index(), "amount": d.amount.to_string() }))
                    .collect(),
            ),
            "getCarDuties" => {
                let vin = arg_str(method, args, 0)?;
                Value::Array(
                    self.car_duties
                        .iter()
                        .filter(|c| c.vin == vin)
                        .map(|c| json!(c.label.index()))
                        .collect(),
                )
            }
            "getInsurancePolicies" => {
                let vin = arg_str(method, args, 0)?;
                Value::Array(
                    self.insurance_policies
                        .iter()
                        .filter(|p| p.vin == vin)
                        .map(|p| json!({ "series": p.series, "number": p.number }))
                        .collect(),
                )
            }
            "getPassports" => {
                let vin = arg_str(method, args, 0)?;
                Value::Array(
                    self.passports
                        .iter()
                        .filter(|p| p.vin == vin)
                        .map(|p| json!({ "region": p.region, "series": p.series, "number": p.number }))
                        .collect(),
                )
            }
            "getRegistrationDates" => {
                let vin = arg_str(method, args, 0)?;
                Value::Array(
                    self.registration_dates
                        .iter()
                        .filter(|r| r.vin == vin)
                        .map(|r| json!({ "start": r.start, "end": r.end }))
                        .collect(),
                )
            }
            _ => return Err(revert(method, "unknown view function")),
        };
        Ok(value)
    }
}

impl LedgerState {
    fn next_tx_hash(&mut self) -> String {
        self.tx_count += 1;
        format!("0x{:064x}", self.tx_count)
    }

    fn contract_mut(&mut self, address: &ContractAddress) -> Result<&mut ContractState> {
        self.contracts
            .get_mut(&address.as_str().to_ascii_lowercase())
            .ok_or_else(|| RegistryError::InterfaceError {
                message: format!("no contract deployed at {}", address),
            })
    }
}

#[async_trait]
impl ContractClient for InMemoryLedger {
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployReceipt> {
        if request.contract != CONTRACT_NAME {
            return Err(RegistryError::InterfaceError {
                message: format!("local ledger cannot deploy '{}'", request.contract),
            });
        }

        let vin = arg_str("constructor", &request.constructor_args, 0)?;
        let owner_name = arg_str("constructor", &request.constructor_args, 1)?;

        let mut state = self.lock();
        state.nonce += 1;
        let raw_address = format!("0x{:040x}", 0x5fbd_b231_0000_u64 + state.nonce);
        let address = ContractAddress::parse(&raw_address)
            .map_err(|message| RegistryError::InterfaceError { message })?;

        state.contracts.insert(
            raw_address.to_ascii_lowercase(),
            ContractState {
                owner: request.from,
                vin,
                owner_name,
                duties: Vec::new(),
                car_duties: Vec::new(),
                insurance_policies: Vec::new(),
                passports: Vec::new(),
                registration_dates: Vec::new(),
            },
        );
        let tx_hash = state.next_tx_hash();

        tracing::debug!("🧪 Local ledger deployed {} at {}", request.contract, address);
        Ok(DeployReceipt { address, tx_hash })
    }

    async fn submit(&self, address: &ContractAddress, call: &ContractCall) -> Result<TxReceipt> {
        let mut state = self.lock();
        state.contract_mut(address)?.apply(call)?;
        Ok(TxReceipt {
            tx_hash: state.next_tx_hash(),
        })
    }
}

#[async_trait]
impl ContractReader for InMemoryLedger {
    async fn read(&self, address: &ContractAddress, method: &str, args: &[Value]) -> Result<Value> {
        let mut state = self.lock();
        let contract = state.contract_mut(address)?;
        contract.query(method, args)
    }

    fn supports(&self, method: &str) -> bool {
        READ_METHODS.contains(&method)
    }
}
