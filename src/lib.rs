pub mod actions;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod notify;
pub mod scheduler;
pub mod site;

pub use error::{Result, WatchError};
