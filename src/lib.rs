pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod storage;
pub mod telegram;
pub mod validation;
pub mod web;

pub use config::Config;
pub use error::{NotifyError, Result};
