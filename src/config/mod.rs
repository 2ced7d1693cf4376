//! Configuration module for TextVault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::TvaultPaths;
pub use settings::{BackupRetention, Settings};
