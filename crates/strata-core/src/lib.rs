pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod retry;
pub mod stage;
pub mod target;

pub use error::{Result, StrataError};
