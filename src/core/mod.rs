pub mod manifest;
pub mod runner;
pub mod units;

pub use crate::domain::model::{CallId, ContractAddress, DutyLabel, Wei};
pub use crate::domain::ports::{ContractClient, ContractReader, Journal};
pub use crate::utils::error::Result;
