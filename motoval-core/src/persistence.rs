//! Artifact files: atomic replacement and SHA-256 digests.
//!
//! Cleaned datasets, model artifacts and config files are staged in a hidden
//! `.<name>.partial` sibling and renamed over the target. Every write returns
//! the digest of the bytes that landed, so callers can record it in a
//! manifest and later refuse files that no longer match.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Content digest of a written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Lower-case hex SHA-256.
    pub sha256: String,
    pub size_bytes: u64,
}

impl FileDigest {
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            sha256: format!("{:x}", Sha256::digest(bytes)),
            size_bytes: bytes.len() as u64,
        }
    }
}

fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".partial");
    Ok(path.with_file_name(staged))
}

/// Replace `path` with `bytes`, creating parent directories as needed.
pub fn write_file(path: &Path, bytes: &[u8]) -> io::Result<FileDigest> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let staged = staging_path(path)?;
    std::fs::write(&staged, bytes)?;
    if let Err(e) = std::fs::rename(&staged, path) {
        let _ = std::fs::remove_file(&staged);
        return Err(e);
    }

    let digest = FileDigest::of(bytes);
    tracing::debug!(
        path = %path.display(),
        bytes = digest.size_bytes,
        sha256 = %digest.sha256,
        "wrote file"
    );
    Ok(digest)
}

/// Serialize `value` as compact JSON and write it with [`write_file`].
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<FileDigest> {
    let bytes = serde_json::to_vec(value).map_err(io::Error::other)?;
    write_file(path, &bytes)
}

/// Read `path` and check it against `expected`.
///
/// A mismatch is reported as [`io::ErrorKind::InvalidData`].
pub fn read_verified(path: &Path, expected: &FileDigest) -> io::Result<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    let actual = FileDigest::of(&bytes);
    if actual != *expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} hash mismatch: expected {} ({} bytes), found {} ({} bytes)",
                path.display(),
                expected.sha256,
                expected.size_bytes,
                actual.sha256,
                actual.size_bytes
            ),
        ));
    }
    Ok(bytes)
}

/// Deserialize a JSON file, or `None` when it does not exist.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_digest_of_known_bytes() {
        let digest = FileDigest::of(b"abc");
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest.size_bytes, 3);
    }

    #[test]
    fn test_written_file_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("scaler.json");

        let digest = write_json(&path, &vec![150.0, 12.5]).unwrap();
        let bytes = read_verified(&path, &digest).unwrap();
        assert_eq!(bytes, b"[150.0,12.5]");
        assert_eq!(read_json::<Vec<f64>>(&path).unwrap(), Some(vec![150.0, 12.5]));
    }

    #[test]
    fn test_tampered_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feature_names.json");
        let digest = write_json(&path, &["cc", "brand_Honda"]).unwrap();

        std::fs::write(&path, r#"["cc","brand_Yamaha"]"#).unwrap();
        let err = read_verified(&path, &digest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_rewrite_replaces_and_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cleaned_bikes.csv");

        let first = write_file(&path, b"price\n1\n").unwrap();
        let second = write_file(&path, b"price\n2\n").unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "price\n2\n");
        assert!(!dir.path().join(".cleaned_bikes.csv.partial").exists());
    }

    #[test]
    fn test_read_json_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("manifest.json");
        assert_eq!(read_json::<FileDigest>(&missing).unwrap(), None);

        std::fs::write(&missing, "{ not json").unwrap();
        let err = read_json::<FileDigest>(&missing).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
