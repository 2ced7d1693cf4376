//! Entry name validation
//!
//! An entry name doubles as a directory name and a file name inside the vault
//! root, so anything that could escape the root or collide with the vault's own
//! bookkeeping files is rejected.

use std::fmt;

use crate::backup::INDEX_FILE_NAME;
use crate::error::VaultError;

/// Maximum entry name length in bytes (common filesystem limit minus room for
/// the backup suffix)
pub const MAX_NAME_LEN: usize = 200;

/// Reasons an entry name is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryNameError {
    Empty,
    TooLong(usize),
    PathSeparator,
    NulByte,
    Hidden,
    Reserved,
}

impl EntryNameError {
    fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "name cannot be empty",
            Self::TooLong(_) => "name is too long",
            Self::PathSeparator => "name cannot contain a path separator",
            Self::NulByte => "name cannot contain a NUL byte",
            Self::Hidden => "name cannot start with '.'",
            Self::Reserved => "name is reserved",
        }
    }
}

impl fmt::Display for EntryNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(len) => write!(f, "name too long ({} bytes, max {})", len, MAX_NAME_LEN),
            other => write!(f, "{}", other.reason()),
        }
    }
}

impl std::error::Error for EntryNameError {}

/// Check that `name` can be used as an entry name
pub fn check_entry_name(name: &str) -> Result<(), EntryNameError> {
    if name.is_empty() {
        return Err(EntryNameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EntryNameError::TooLong(name.len()));
    }
    if name.contains(&['/', '\\'][..]) {
        return Err(EntryNameError::PathSeparator);
    }
    if name.contains('\0') {
        return Err(EntryNameError::NulByte);
    }
    // Also covers "." and ".."
    if name.starts_with('.') {
        return Err(EntryNameError::Hidden);
    }
    if name == INDEX_FILE_NAME {
        return Err(EntryNameError::Reserved);
    }
    Ok(())
}

/// Validate `name`, converting failures into [`VaultError::InvalidEntryName`]
pub fn validate_entry_name(name: &str) -> Result<(), VaultError> {
    check_entry_name(name).map_err(|e| VaultError::InvalidEntryName {
        name: name.to_string(),
        reason: e.reason(),
    })
}
