pub mod config;
pub mod error;
pub mod error_utils;
pub mod filter;
pub mod session;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use filter::*;
pub use session::*;
pub use types::*;
