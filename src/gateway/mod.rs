// Read gateway: derives a fixed route table from the contract interface and
// serves it over HTTP. No write routes are exposed.

pub mod abi;
pub mod routes;
pub mod server;

pub use routes::RouteTable;
pub use server::{router, serve, GatewayState};
