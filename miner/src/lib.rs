pub mod error;
pub mod lock;
pub mod mine;
pub mod outcome;
pub mod profit;
pub mod session;
pub mod timing;

pub use error::*;
pub use lock::*;
pub use mine::*;
pub use outcome::*;
pub use profit::*;
pub use session::*;
pub use timing::*;
