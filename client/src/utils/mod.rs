mod contract;
mod rpc;
mod retry;

pub use contract::*;
pub use rpc::*;
pub use retry::*;
