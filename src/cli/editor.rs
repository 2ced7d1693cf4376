//! External editor invocation
//!
//! `file update` hands the entry's content to a text editor through a temp file
//! and reads the result back; the entry itself is only written through
//! `EntryManager::update`.

use std::fs;
use std::io::{Read, Write};
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::settings::Settings;
use crate::error::{VaultError, VaultResult};

/// Pick the editor command: `--vim`, then settings, then $VISUAL, $EDITOR, nano
pub fn resolve_editor(settings: &Settings, use_vim: bool) -> String {
    if use_vim {
        return "vim".to_string();
    }

    let configured = |value: Option<String>| value.filter(|e| !e.trim().is_empty());

    configured(settings.editor.clone())
        .or_else(|| configured(std::env::var("VISUAL").ok()))
        .or_else(|| configured(std::env::var("EDITOR").ok()))
        .unwrap_or_else(|| "nano".to_string())
}

/// Let the user edit `initial` in `editor`, returning the edited text
pub fn edit_text(editor: &str, name: &str, initial: &str) -> VaultResult<String> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| VaultError::Editor("No editor configured".into()))?;

    let scratch = edit_file(name, initial)?;
    let temp_path = scratch.path();

    debug!(editor, file = %temp_path.display(), "Launching editor");
    let mut command = Command::new(program);
    command.args(parts).arg(temp_path);
    if std::env::var_os("TERM").is_none() {
        command.env("TERM", "xterm");
    }

    let result = match command.status() {
        Ok(status) if status.success() => fs::read_to_string(temp_path).map_err(VaultError::from),
        Ok(status) => Err(VaultError::Editor(format!(
            "'{}' exited with {}",
            program, status
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VaultError::Editor(format!(
            "Editor '{}' not found. Please install it or set one in config.json",
            program
        ))),
        Err(e) => Err(VaultError::Editor(format!("Failed to launch '{}': {}", program, e))),
    };

    // Dropping the handle removes the file
    drop(scratch);
    result
}

/// Read replacement content from standard input
pub fn read_stdin() -> VaultResult<String> {
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

/// Private temp file holding `initial`, removed when the handle is dropped
///
/// The name is randomized and the file is created exclusively, readable only by
/// the owner.
fn edit_file(name: &str, initial: &str) -> VaultResult<NamedTempFile> {
    let prefix = format!("tvault-{}-", name);
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".txt")
        .tempfile()
        .map_err(|e| VaultError::Editor(format!("Failed to create temp file: {}", e)))?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vim_flag_wins() {
        let mut settings = Settings::default();
        settings.editor = Some("emacs".into());
        assert_eq!(resolve_editor(&settings, true), "vim");
    }

    #[test]
    fn test_settings_editor_preferred() {
        let mut settings = Settings::default();
        settings.editor = Some("micro".into());
        assert_eq!(resolve_editor(&settings, false), "micro");
    }

    #[test]
    fn test_blank_settings_editor_is_skipped() {
        let mut settings = Settings::default();
        settings.editor = Some("  ".into());
        let editor = resolve_editor(&settings, false);
        assert!(!editor.trim().is_empty());

        let expected = ["VISUAL", "EDITOR"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "nano".to_string());
        assert_eq!(editor, expected);
    }

    #[test]
    fn test_edit_file_is_private_and_removed() {
        let first = edit_file("notes", "secret").unwrap();
        let second = edit_file("notes", "secret").unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(fs::read_to_string(first.path()).unwrap(), "secret");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(first.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o077, 0);
        }

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_text_with_non_interactive_editor() {
        // `true` exits successfully without touching the file
        let edited = edit_text("true", "notes", "unchanged").unwrap();
        assert_eq!(edited, "unchanged");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor() {
        let err = edit_text("false", "notes", "x").unwrap_err();
        assert!(matches!(err, VaultError::Editor(_)));
    }

    #[test]
    fn test_missing_editor() {
        let err = edit_text("definitely-not-an-editor-binary", "notes", "x").unwrap_err();
        assert!(matches!(err, VaultError::Editor(_)));
    }
}
