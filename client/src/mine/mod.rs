pub mod mine;

pub use mine::*;
