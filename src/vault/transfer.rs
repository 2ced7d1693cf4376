//! Vault transfer
//!
//! Packs a vault root's whole directory tree into a single zip archive and
//! unpacks it again. File contents are stored byte for byte; member names are
//! relative to the root and always use `/` separators.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::write_bytes_atomic;

/// What an export wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of files packed
    pub files: usize,
    /// Size of the archive in bytes
    pub archive_bytes: u64,
}

/// Pack the tree under `root` into `archive_path`
pub fn export_vault(root: &Path, archive_path: &Path) -> VaultResult<ExportSummary> {
    if !root.is_dir() {
        return Err(VaultError::Archive(format!(
            "Vault root does not exist: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &files {
        let content = fs::read(path).map_err(|e| {
            VaultError::Archive(format!("Cannot archive {}: {}", path.display(), e))
        })?;
        debug!(member = %name, bytes = content.len(), "Archiving file");
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| zip_error(archive_path, e))?;
        writer.write_all(&content)?;
    }

    let bytes = writer
        .finish()
        .map_err(|e| zip_error(archive_path, e))?
        .into_inner();
    write_bytes_atomic(archive_path, &bytes)?;

    let summary = ExportSummary {
        files: files.len(),
        archive_bytes: bytes.len() as u64,
    };
    info!(
        root = %root.display(),
        archive = %archive_path.display(),
        files = summary.files,
        "Vault exported"
    );
    Ok(summary)
}

/// Unpack `archive_path` into `target`, which must not exist yet
///
/// Returns the number of files written. If unpacking fails part way the target
/// directory is removed again.
pub fn import_vault(archive_path: &Path, target: &Path) -> VaultResult<usize> {
    let mut archive = open_archive(archive_path)?;

    if target.exists() {
        return Err(VaultError::Archive(format!(
            "Target path already exists: {}",
            target.display()
        )));
    }

    // Validate every member name before touching the disk
    let mut planned = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let member = archive
            .by_index(i)
            .map_err(|e| zip_error(archive_path, e))?;
        let is_dir = member.is_dir();
        let relative = safe_relative_path(member.name().trim_end_matches('/'))?;
        planned.push((i, relative, is_dir));
    }

    fs::create_dir_all(target).map_err(|e| {
        VaultError::Io(format!("Failed to create {}: {}", target.display(), e))
    })?;

    match unpack(&mut archive, archive_path, target, &planned) {
        Ok(files) => {
            info!(
                archive = %archive_path.display(),
                target = %target.display(),
                files,
                "Vault archive unpacked"
            );
            Ok(files)
        }
        Err(err) => {
            warn!(target = %target.display(), %err, "Import failed, removing partial vault");
            let _ = fs::remove_dir_all(target);
            Err(err)
        }
    }
}

/// Member names of an archive, in archive order
pub fn archive_members(archive_path: &Path) -> VaultResult<Vec<String>> {
    let mut archive = open_archive(archive_path)?;
    (0..archive.len())
        .map(|i| {
            archive
                .by_index(i)
                .map(|member| member.name().to_string())
                .map_err(|e| zip_error(archive_path, e))
        })
        .collect()
}

fn open_archive(archive_path: &Path) -> VaultResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive_path).map_err(|e| {
        VaultError::Archive(format!(
            "Failed to open archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(archive_path, e))
}

fn unpack(
    archive: &mut ZipArchive<BufReader<File>>,
    archive_path: &Path,
    target: &Path,
    planned: &[(usize, PathBuf, bool)],
) -> VaultResult<usize> {
    let mut files = 0;
    for (index, relative, is_dir) in planned {
        let destination = target.join(relative);
        if *is_dir {
            fs::create_dir_all(&destination)?;
            continue;
        }

        let mut member = archive
            .by_index(*index)
            .map_err(|e| zip_error(archive_path, e))?;
        let mut content = Vec::new();
        member.read_to_end(&mut content)?;
        write_bytes_atomic(&destination, &content)?;
        files += 1;
    }
    Ok(files)
}

fn zip_error(archive_path: &Path, err: ZipError) -> VaultError {
    VaultError::Archive(format!("{}: {}", archive_path.display(), err))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> VaultResult<()> {
    for dir_entry in fs::read_dir(dir)
        .map_err(|e| VaultError::Io(format!("Failed to read {}: {}", dir.display(), e)))?
    {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        let file_type = dir_entry.file_type()?;

        if file_type.is_dir() {
            collect_files(root, &path, out)?;
            continue;
        }
        if !file_type.is_file() || is_temp_file(&path) {
            continue;
        }

        out.push((member_name_for(root, &path)?, path));
    }
    Ok(())
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.') && n.ends_with(".tmp"))
}

fn member_name_for(root: &Path, path: &Path) -> VaultResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| VaultError::Archive(format!("{} is outside the vault", path.display())))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => {
                return Err(VaultError::Archive(format!(
                    "Non UTF-8 path: {}",
                    path.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Turn an archive member name into a relative path that cannot escape the target
fn safe_relative_path(archived: &str) -> VaultResult<PathBuf> {
    let unsafe_path = || VaultError::Archive(format!("Unsafe path in archive: {}", archived));

    let mut out = PathBuf::new();
    for part in archived.split('/') {
        let component = Path::new(part).components().next();
        match component {
            Some(Component::Normal(name)) if Path::new(part).components().count() == 1 => {
                out.push(name)
            }
            _ => return Err(unsafe_path()),
        }
    }

    if out.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(out)
}
