//! Downloads RockBLOCK SBD attachments from Gmail and archives the messages.

pub mod auth;
pub mod config;
pub mod error;
pub mod gmail;
pub mod mailbox;
pub mod models;
pub mod processor;
pub mod report;

pub use error::{Error, Result};
