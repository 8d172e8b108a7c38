pub mod config;
pub mod core;
pub mod http_client;
pub mod journal;
pub mod services;

pub use crate::config::Config;
pub use crate::core::{JournalError, Result};
pub use crate::journal::JournalService;
