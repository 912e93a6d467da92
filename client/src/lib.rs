pub mod utils;
pub mod mine;
pub mod wallet;
pub mod notify;

pub use utils::*;
pub use mine::*;
pub use wallet::*;
pub use notify::*;
