use crate::core::units::{format_ether, parse_ether};
use crate::domain::model::{
    AccountRef, CallId, CarDuty, Duty, DutyLabel, InsurancePolicy, RegistrationInterval,
    VehiclePassport,
};
use crate::domain::ports::{ContractCall, DeployRequest};
use crate::utils::error::{RegistryError, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    RegisterDuty,
    AssociateDuty,
    AttachInsurancePolicy,
    AttachPassport,
    AttachRegistrationInterval,
}

impl OperationKind {
    /// 呼叫識別碼前綴，各種操作互不重疊
    pub fn id_prefix(self) -> &'static str {
        match self {
            OperationKind::RegisterDuty => "duty",
            OperationKind::AssociateDuty => "carDuty",
            OperationKind::AttachInsurancePolicy => "addInsurancePolicy",
            OperationKind::AttachPassport => "addPassport",
            OperationKind::AttachRegistrationInterval => "addRegistrationDate",
        }
    }

    /// 合約方法名稱
    pub fn method(self) -> &'static str {
        match self {
            OperationKind::RegisterDuty => "addDuty",
            OperationKind::AssociateDuty => "addCarDuty",
            OperationKind::AttachInsurancePolicy => "addInsurancePolicy",
            OperationKind::AttachPassport => "addPassport",
            OperationKind::AttachRegistrationInterval => "addRegistrationDate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    RegisterDuty(Duty),
    AssociateDuty(CarDuty),
    AttachInsurancePolicy(InsurancePolicy),
    AttachPassport(VehiclePassport),
    AttachRegistrationInterval(RegistrationInterval),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::RegisterDuty(_) => OperationKind::RegisterDuty,
            Operation::AssociateDuty(_) => OperationKind::AssociateDuty,
            Operation::AttachInsurancePolicy(_) => OperationKind::AttachInsurancePolicy,
            Operation::AttachPassport(_) => OperationKind::AttachPassport,
            Operation::AttachRegistrationInterval(_) => OperationKind::AttachRegistrationInterval,
        }
    }

    /// 依合約 ABI 順序排列的呼叫參數
    pub fn args(&self) -> Vec<Value> {
        match self {
            Operation::RegisterDuty(duty) => {
                vec![json!(duty.label.index()), json!(duty.amount.to_string())]
            }
            Operation::AssociateDuty(car_duty) => {
                vec![json!(car_duty.vin), json!(car_duty.label.index())]
            }
            Operation::AttachInsurancePolicy(policy) => {
                vec![json!(policy.vin), json!(policy.series), json!(policy.number)]
            }
            Operation::AttachPassport(passport) => vec![
                json!(passport.vin),
                json!(passport.region),
                json!(passport.series),
                json!(passport.number),
            ],
            Operation::AttachRegistrationInterval(interval) => {
                vec![json!(interval.vin), json!(interval.start), json!(interval.end)]
            }
        }
    }

    pub fn to_call(&self, from: AccountRef) -> ContractCall {
        ContractCall {
            method: self.kind().method().to_string(),
            args: self.args(),
            from,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RegisterDuty(duty) => {
                write!(f, "addDuty({}, {} ETH)", duty.label, format_ether(duty.amount))
            }
            Operation::AssociateDuty(car_duty) => {
                write!(f, "addCarDuty({}, {})", car_duty.vin, car_duty.label)
            }
            Operation::AttachInsurancePolicy(policy) => write!(
                f,
                "addInsurancePolicy({}, {} {})",
                policy.vin, policy.series, policy.number
            ),
            Operation::AttachPassport(passport) => write!(
                f,
                "addPassport({}, {} {} {})",
                passport.vin, passport.region, passport.series, passport.number
            ),
            Operation::AttachRegistrationInterval(interval) => write!(
                f,
                "addRegistrationDate({}, {}, {})",
                interval.vin, interval.start, interval.end
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: CallId,
    pub operation: Operation,
}

/// 合約部署資訊
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTarget {
    pub module: String,
    pub contract: String,
    pub from: AccountRef,
    pub constructor_args: Vec<Value>,
}

impl DeploymentTarget {
    pub fn future_id(&self) -> CallId {
        CallId::new(format!("{}#{}", self.module, self.contract))
    }

    pub fn deploy_request(&self, bytecode: Option<String>) -> DeployRequest {
        DeployRequest {
            future_id: self.future_id(),
            contract: self.contract.clone(),
            constructor_args: self.constructor_args.clone(),
            from: self.from,
            bytecode,
        }
    }
}

/// 固定順序的部署與設定指令清單
#[derive(Debug, Clone)]
pub struct Manifest {
    deployment: DeploymentTarget,
    commands: Vec<Command>,
}

impl Manifest {
    /// 建立清單並拒絕重複的呼叫識別碼
    pub fn new(deployment: DeploymentTarget, commands: Vec<Command>) -> Result<Self> {
        let mut seen = HashSet::new();
        seen.insert(deployment.future_id());

        for command in &commands {
            if !seen.insert(command.id.clone()) {
                return Err(RegistryError::DuplicateCallId {
                    call_id: command.id.to_string(),
                });
            }
        }

        Ok(Self {
            deployment,
            commands,
        })
    }

    pub fn deployment(&self) -> &DeploymentTarget {
        &self.deployment
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn call_ids(&self) -> Vec<CallId> {
        std::iter::once(self.deployment.future_id())
            .chain(self.commands.iter().map(|c| c.id.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn count_of(&self, kind: OperationKind) -> usize {
        self.commands
            .iter()
            .filter(|c| c.operation.kind() == kind)
            .count()
    }
}

pub struct ManifestBuilder {
    deployment: DeploymentTarget,
    duties: Vec<(DutyLabel, String)>,
    car_duties: Vec<CarDuty>,
    insurance_policies: Vec<InsurancePolicy>,
    passports: Vec<VehiclePassport>,
    intervals: Vec<RegistrationInterval>,
}

impl ManifestBuilder {
    pub fn new(deployment: DeploymentTarget) -> Self {
        Self {
            deployment,
            duties: Vec::new(),
            car_duties: Vec::new(),
            insurance_policies: Vec::new(),
            passports: Vec::new(),
            intervals: Vec::new(),
        }
    }

    /// 同一規費重複登記時，以最後的價格為準
    pub fn register_duty(&mut self, label: DutyLabel, price: &str) -> &mut Self {
        match self.duties.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = price.to_string(),
            None => self.duties.push((label, price.to_string())),
        }
        self
    }

    pub fn associate_duty(&mut self, vin: &str, label: DutyLabel) -> &mut Self {
        self.car_duties.push(CarDuty {
            vin: vin.to_string(),
            label,
        });
        self
    }

    pub fn attach_insurance_policy(&mut self, vin: &str, series: &str, number: &str) -> &mut Self {
        self.insurance_policies.push(InsurancePolicy {
            vin: vin.to_string(),
            series: series.to_string(),
            number: number.to_string(),
        });
        self
    }

    pub fn attach_passport(
        &mut self,
        vin: &str,
        region: &str,
        series: &str,
        number: &str,
    ) -> &mut Self {
        self.passports.push(VehiclePassport {
            vin: vin.to_string(),
            region: region.to_string(),
            series: series.to_string(),
            number: number.to_string(),
        });
        self
    }

    pub fn attach_registration_interval(&mut self, vin: &str, start: u64, end: u64) -> &mut Self {
        self.intervals.push(RegistrationInterval {
            vin: vin.to_string(),
            start,
            end,
        });
        self
    }

    /// 轉換價格、檢查關聯，並依序指派識別碼
    pub fn build(&self) -> Result<Manifest> {
        let mut operations = Vec::new();

        for (label, price) in &self.duties {
            operations.push(Operation::RegisterDuty(Duty {
                label: *label,
                amount: parse_ether(price)?,
            }));
        }

        for car_duty in &self.car_duties {
            if !self.duties.iter().any(|(label, _)| *label == car_duty.label) {
                return Err(RegistryError::ConfigValidationError {
                    field: "vehicle.duties".to_string(),
                    message: format!(
                        "duty '{}' is associated with {} but has no registered price",
                        car_duty.label, car_duty.vin
                    ),
                });
            }
            operations.push(Operation::AssociateDuty(car_duty.clone()));
        }

        operations.extend(
            self.insurance_policies
                .iter()
                .cloned()
                .map(Operation::AttachInsurancePolicy),
        );
        operations.extend(self.passports.iter().cloned().map(Operation::AttachPassport));
        operations.extend(
            self.intervals
                .iter()
                .cloned()
                .map(Operation::AttachRegistrationInterval),
        );

        let mut counters: HashMap<OperationKind, usize> = HashMap::new();
        let commands = operations
            .into_iter()
            .map(|operation| {
                let kind = operation.kind();
                let index = counters.entry(kind).or_insert(0);
                let id = CallId::new(format!("{}{}", kind.id_prefix(), index));
                *index += 1;
                Command { id, operation }
            })
            .collect();

        Manifest::new(self.deployment.clone(), commands)
    }
}
