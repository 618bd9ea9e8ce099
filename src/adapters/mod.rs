// Adapters layer: concrete implementations of the domain ports.

pub mod journal;
pub mod ledger;
pub mod rpc;

pub use journal::{FileJournal, MemoryJournal};
pub use ledger::InMemoryLedger;
pub use rpc::RpcContractClient;
