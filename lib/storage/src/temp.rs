use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_bucket_common::EngineResult;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

/// The directory in which operators and the external sort create their temporary files.
///
/// File names are drawn from a (optionally seeded) random source so that operators of the same
/// plan never collide.
#[derive(Debug)]
pub struct TempSpace {
    directory: PathBuf,
    /// Keeps a private directory alive. `None` if the caller provided the directory.
    _owned: Option<TempDir>,
    rng: Mutex<StdRng>,
}

impl TempSpace {
    /// Creates a [TempSpace] in a new private directory that is removed on drop.
    pub fn new(seed: Option<u64>) -> EngineResult<Self> {
        let owned = tempfile::Builder::new().prefix("rdf-bucket-").tempdir()?;
        Ok(Self {
            directory: owned.path().to_path_buf(),
            _owned: Some(owned),
            rng: Mutex::new(create_rng(seed)),
        })
    }

    /// Creates a [TempSpace] in `directory`, creating it if necessary.
    pub fn in_directory(directory: impl Into<PathBuf>, seed: Option<u64>) -> EngineResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            _owned: None,
            rng: Mutex::new(create_rng(seed)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Creates a new, empty file with a random name starting with `prefix`.
    pub fn allocate(&self, prefix: &str) -> EngineResult<TempFile> {
        loop {
            let id: u64 = self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random();
            let path = self.directory.join(format!("{prefix}-{id:016x}.tmp"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    tracing::trace!("Allocated temporary file {}", path.display());
                    return Ok(TempFile {
                        path,
                        deleted: false,
                    });
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// A temporary file that is deleted when dropped.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    deleted: bool,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file for reading.
    pub fn open(&self) -> EngineResult<File> {
        Ok(File::open(&self.path)?)
    }

    /// Opens the file for appending.
    pub fn append(&self) -> EngineResult<File> {
        Ok(OpenOptions::new().append(true).open(&self.path)?)
    }

    /// Truncates the file and opens it for writing.
    pub fn truncate(&self) -> EngineResult<File> {
        Ok(OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?)
    }

    /// Deletes the file, reporting errors that dropping would swallow.
    pub fn delete(mut self) -> EngineResult<()> {
        self.deleted = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.deleted {
            return;
        }
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != ErrorKind::NotFound {
                tracing::debug!(
                    "Could not delete temporary file {}: {error}",
                    self.path.display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn allocated_files_are_unique_and_removed() {
        let space = TempSpace::new(Some(7)).unwrap();
        let first = space.allocate("chunk").unwrap();
        let second = space.allocate("chunk").unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(space.directory()));

        first.append().unwrap().write_all(b"abc").unwrap();
        assert_eq!(fs::read(first.path()).unwrap(), b"abc");

        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!first_path.exists());

        let second_path = second.path().to_path_buf();
        second.delete().unwrap();
        assert!(!second_path.exists());
    }

    #[test]
    fn seeded_spaces_generate_the_same_names() {
        let left = tempfile::tempdir().unwrap();
        let right = tempfile::tempdir().unwrap();
        let left = TempSpace::in_directory(left.path(), Some(42)).unwrap();
        let right = TempSpace::in_directory(right.path(), Some(42)).unwrap();
        let left = left.allocate("x").unwrap();
        let right = right.allocate("x").unwrap();
        assert_eq!(left.path().file_name(), right.path().file_name());
    }
}
