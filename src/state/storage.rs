// File system operations for exercise artifacts
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid exercise id: {0}")]
    InvalidId(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Artifact files under `<data_dir>/exercises/<id>/`
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(data_dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(data_dir)?;
        Ok(Storage {
            root: data_dir.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids become directory names, so only letters, digits, '-' and '_' are allowed
    fn checked_dir(&self, exercise_id: &str) -> StorageResult<PathBuf> {
        let valid = !exercise_id.is_empty()
            && exercise_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidId(exercise_id.to_string()));
        }
        Ok(self.root.join("exercises").join(exercise_id))
    }

    /// Get the directory for an exercise, creating it
    pub fn exercise_dir(&self, exercise_id: &str) -> StorageResult<PathBuf> {
        let dir = self.checked_dir(exercise_id)?;
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Store a file for an exercise and return its path and SHA256 hash
    pub fn store_file(&self, exercise_id: &str, filename: &str, data: &[u8]) -> StorageResult<(PathBuf, String)> {
        let file_path = self.exercise_dir(exercise_id)?.join(filename);
        fs::write(&file_path, data)?;
        Ok((file_path, calculate_sha256(data)))
    }

    /// Remove an exercise's directory; missing directories are fine
    pub fn remove_exercise(&self, exercise_id: &str) -> StorageResult<()> {
        let dir = self.checked_dir(exercise_id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read a file from disk
pub fn read_file(path: &str) -> StorageResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        let data = b"hello world";
        let hash = calculate_sha256(data);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_store_and_remove() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path()).unwrap();

        let (path, hash) = storage.store_file("ex-1234abcd", "score.mid", b"MThd").unwrap();
        assert!(path.ends_with("exercises/ex-1234abcd/score.mid"));
        assert_eq!(hash, calculate_sha256(b"MThd"));
        assert_eq!(read_file(path.to_str().unwrap()).unwrap(), b"MThd");

        storage.remove_exercise("ex-1234abcd").unwrap();
        assert!(!path.exists());
        // Removing twice is fine
        storage.remove_exercise("ex-1234abcd").unwrap();
    }

    #[test]
    fn test_rejects_path_ids() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path()).unwrap();
        assert!(matches!(storage.exercise_dir("../etc"), Err(StorageError::InvalidId(_))));
        assert!(matches!(storage.store_file("", "x", b""), Err(StorageError::InvalidId(_))));
    }
}
