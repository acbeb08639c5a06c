use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage directory missing or not writable: {0}")]
    StorageDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure a storage directory exists; create if missing.
pub fn ensure_storage_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StorageDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StorageDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StorageDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes `{dir}/{name}` through a temp file and a rename, so readers never
/// observe a half-written record or blob.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, name: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_storage_dir(&self.dir)?;

        let target = self.dir.join(name);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Attempts at a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Claims a file name in `dir` that no other file uses, starting with
/// `file_name` and falling back to `{stem}-{token}.{ext}`.
///
/// The returned path exists as an empty placeholder owned by the caller, so
/// concurrent callers asking for the same name always get different paths.
pub fn reserve_unique(dir: &Path, file_name: &str) -> Result<PathBuf, PersistError> {
    ensure_storage_dir(dir)?;
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let extension = name.extension().and_then(|ext| ext.to_str());

    let mut candidate = dir.join(file_name);
    for _ in 0..MAX_NAME_ATTEMPTS {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let token = Uuid::new_v4().simple().to_string();
                let token = &token[..8];
                candidate = match extension {
                    Some(ext) => dir.join(format!("{stem}-{token}.{ext}")),
                    None => dir.join(format!("{stem}-{token}")),
                };
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(PersistError::StorageDir(format!(
        "no free name for {file_name} in {}",
        dir.display()
    )))
}

/// Moves a finished file into `dir` under its own name, or under a
/// suffixed name when that one is taken. Existing files are never replaced.
pub fn move_into(dir: &Path, file: &Path) -> Result<PathBuf, PersistError> {
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            PersistError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no usable file name", file.display()),
            ))
        })?;
    let target = reserve_unique(dir, name)?;
    if let Err(err) = fs::rename(file, &target) {
        let _ = fs::remove_file(&target);
        return Err(err.into());
    }
    Ok(target)
}
