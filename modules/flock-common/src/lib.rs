pub mod config;
pub mod types;

pub use config::{FlockConfig, TenderConfig};
pub use types::*;
