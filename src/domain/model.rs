use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 規費種類。合約端以 uint8 索引表示，順序不可更動
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyLabel {
    Registration,
    LicensePlates,
    RegistrationCertificate,
    VehiclePassport,
    TechnicalInspection,
}

impl DutyLabel {
    pub const ALL: [DutyLabel; 5] = [
        DutyLabel::Registration,
        DutyLabel::LicensePlates,
        DutyLabel::RegistrationCertificate,
        DutyLabel::VehiclePassport,
        DutyLabel::TechnicalInspection,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DutyLabel::Registration => "registration",
            DutyLabel::LicensePlates => "license_plates",
            DutyLabel::RegistrationCertificate => "registration_certificate",
            DutyLabel::VehiclePassport => "vehicle_passport",
            DutyLabel::TechnicalInspection => "technical_inspection",
        }
    }
}

impl fmt::Display for DutyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DutyLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.name() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// 最小單位金額 (10^-18)。JSON 中以十進位字串傳遞，避免超出 u64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Wei(pub u128);

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Wei)
            .map_err(|e| serde::de::Error::custom(format!("invalid base-unit amount '{}': {}", raw, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    pub label: DutyLabel,
    pub amount: Wei,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarDuty {
    pub vin: String,
    pub label: DutyLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub vin: String,
    pub series: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePassport {
    pub vin: String,
    pub region: String,
    pub series: String,
    pub number: String,
}

/// 登記期間，0 代表該端沒有界限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInterval {
    pub vin: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Unbounded,
    At(u64),
}

impl Bound {
    pub fn from_timestamp(timestamp: u64) -> Self {
        if timestamp == 0 {
            Bound::Unbounded
        } else {
            Bound::At(timestamp)
        }
    }
}

impl RegistrationInterval {
    pub fn start_bound(&self) -> Bound {
        Bound::from_timestamp(self.start)
    }

    pub fn end_bound(&self) -> Bound {
        Bound::from_timestamp(self.end)
    }
}

/// 已部署合約位址：`0x` 加上 40 個十六進位字元
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| format!("address '{}' must start with 0x", raw))?;
        if hex.len() != 40 {
            return Err(format!(
                "address '{}' must have 40 hex digits, found {}",
                raw,
                hex.len()
            ));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("address '{}' contains non-hex characters", raw));
        }
        Ok(Self(format!("0x{}", hex)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContractAddress {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContractAddress> for String {
    fn from(address: ContractAddress) -> Self {
        address.0
    }
}

/// 節點帳戶索引，對應部署工具的 `getAccount(n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef(pub u32);

impl AccountRef {
    /// 本地帳本使用的確定性位址
    pub fn local_address(self) -> String {
        format!("0x{:040x}", 0xacc0_0000_u64 + self.0 as u64)
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
