//! Vault management for TextVault
//!
//! A vault is a named root directory holding entries. The registry tracks which
//! vaults exist and which one is current; transfer moves a vault's tree in and
//! out of a single archive file.

pub mod registry;
pub mod transfer;

pub use registry::{CurrentVault, VaultMap, VaultRegistry, DEFAULT_VAULT_NAME};
pub use transfer::{archive_members, export_vault, import_vault, ExportSummary};
