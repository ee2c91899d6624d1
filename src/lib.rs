pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod security;
pub mod types;

pub use config::Config;
pub use error::{AdAclError, Result};
