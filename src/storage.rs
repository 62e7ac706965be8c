//! Filesystem access for key files and encrypted payloads.

use crate::crypto::{EntropySource, OsEntropy};
use crate::error::{CipherError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A single file on disk.
///
/// Key files go through [`Storage::create`] (write-once); payload files
/// produced by the CLI go through [`Storage::save`] (atomic replace).
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance with the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the entire file into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Writes `data` to a file that must not exist yet.
    ///
    /// The existence check and the creation are one `O_EXCL` open, so a file
    /// appearing concurrently is never clobbered. The whole buffer goes out in
    /// a single `write_all`; the handle is closed on every path when it drops.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AlreadyExists`] if the file exists.
    pub fn create(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => CipherError::AlreadyExists(self.path.clone()),
                _ => CipherError::Io(e),
            })?;

        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Writes `data` through a synced sibling temp file that is then renamed
    /// over the target, so readers see either the old payload or the new one.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Io`] if any step fails; the temp file is removed
    /// when the replace itself fails.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;

        // fail if exists
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // fsync directory; directories cannot be opened as files on Windows
        if cfg!(not(target_os = "windows")) {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                File::open(parent)?.sync_all()?;
            }
        }

        Ok(())
    }

    /// Unique temporary path next to the target: `filename.tmp.<randomhex>`.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8]; // 64 bit entropy
        OsEntropy.fill(&mut buf)?;

        let rand_string = buf.iter().map(|b| format!("{b:02x}")).collect::<String>();

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| {
                CipherError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", self.path.display()),
                ))
            })?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!("{file_name}.tmp.{rand_string}")))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// Uses Windows `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH` when the
    /// target exists, and a plain rename for a fresh target.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(CipherError::Io(io::Error::last_os_error()));
        }

        Ok(())
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}
