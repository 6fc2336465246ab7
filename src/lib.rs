pub mod error;
pub mod htlc;
pub mod lightning;
pub mod logging;
pub mod network;
pub mod swap;

pub use error::{Result, SwapError};
