pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod gateway;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{FileJournal, InMemoryLedger, MemoryJournal, RpcContractClient};
pub use crate::config::deployment::DeploymentArtifacts;
pub use crate::config::manifest_config::ManifestConfig;
pub use crate::core::manifest::{Manifest, ManifestBuilder};
pub use crate::core::runner::{ManifestRunner, RunReport};
pub use crate::gateway::{GatewayState, RouteTable};
pub use crate::utils::error::{RegistryError, Result};
