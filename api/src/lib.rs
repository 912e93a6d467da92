pub mod consts;
pub mod error;
pub mod sdk;
pub mod types;
pub mod utils;

pub use crate::consts::*;

pub mod prelude {
    pub use crate::consts::*;
    pub use crate::error::*;
    pub use crate::sdk::*;
    pub use crate::types::*;
    pub use crate::utils::*;
}
