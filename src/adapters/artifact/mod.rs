//! Trained artifact loading.
//!
//! Artifacts are JSON files under a model directory, addressed by fixed
//! relative names. When the directory carries a `manifest.json`, every file
//! read through [`ModelDirectory`] must be listed there with a matching
//! SHA-256 digest.

mod classifier;
mod preprocess;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};

pub use classifier::{ClassifierArtifact, LinearModel, TreeEnsemble, TreeNode};
pub use preprocess::{SimpleImputer, StandardScaler};

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Artifact loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed artifact {name}: {reason}")]
    Shape { name: String, reason: String },

    #[error("Integrity check failed: {0}")]
    Integrity(String),
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    version: u32,
    files: BTreeMap<String, String>,
}

/// Read-only view of a model directory.
#[derive(Debug, Clone)]
pub struct ModelDirectory {
    root: PathBuf,
    manifest: Option<BTreeMap<String, String>>,
}

impl ModelDirectory {
    /// Open `root`, loading its manifest if one is present.
    ///
    /// # Errors
    /// `Integrity` if `require_manifest` is set and no manifest exists, or
    /// if the manifest is malformed.
    pub fn open(root: impl Into<PathBuf>, require_manifest: bool) -> Result<Self, ArtifactError> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST_FILE);

        let manifest = if manifest_path.is_file() {
            let bytes = fs::read(&manifest_path).map_err(|source| ArtifactError::Io {
                path: manifest_path.clone(),
                source,
            })?;
            let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
                ArtifactError::Integrity(format!("Invalid {MANIFEST_FILE} format: {e}"))
            })?;
            if manifest.version != MANIFEST_VERSION {
                return Err(ArtifactError::Integrity(format!(
                    "Unsupported manifest version: {}",
                    manifest.version
                )));
            }
            if manifest.files.is_empty() {
                return Err(ArtifactError::Integrity(format!(
                    "{MANIFEST_FILE} contains no files"
                )));
            }
            tracing::info!(
                "Model manifest loaded ({} files bound)",
                manifest.files.len()
            );
            Some(manifest.files)
        } else if require_manifest {
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} required but not found in {}",
                root.display()
            )));
        } else {
            None
        };

        Ok(Self { root, manifest })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.manifest.is_some()
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    /// Whether every file in `names` is present.
    #[must_use]
    pub fn all_exist(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.exists(n))
    }

    /// Read and deserialize the artifact `name`.
    ///
    /// # Errors
    /// `NotFound` if the file is absent, `Integrity` if a manifest is in
    /// force and does not bind the file's exact contents, `Parse` if the
    /// JSON does not match `T`.
    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(ArtifactError::NotFound(path));
        }
        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        if let Some(files) = &self.manifest {
            let expected = files.get(name).ok_or_else(|| {
                ArtifactError::Integrity(format!("{name} is not bound by {MANIFEST_FILE}"))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), &expected.to_ascii_lowercase()) {
                return Err(ArtifactError::Integrity(format!(
                    "File hash mismatch for {name}"
                )));
            }
        }

        tracing::debug!("Reading artifact {}", path.display());
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse { path, source })
    }

    /// Read and validate a classifier artifact.
    ///
    /// # Errors
    /// See [`ModelDirectory::read`]; also `Shape` if the classifier is
    /// internally inconsistent.
    pub fn classifier(&self, name: &str) -> Result<ClassifierArtifact, ArtifactError> {
        let artifact: ClassifierArtifact = self.read(name)?;
        artifact.validate(name)?;
        Ok(artifact)
    }

    /// # Errors
    /// See [`ModelDirectory::read`].
    pub fn scaler(&self, name: &str) -> Result<StandardScaler, ArtifactError> {
        let scaler: StandardScaler = self.read(name)?;
        scaler.validate(name)?;
        Ok(scaler)
    }

    /// # Errors
    /// See [`ModelDirectory::read`].
    pub fn imputer(&self, name: &str) -> Result<SimpleImputer, ArtifactError> {
        self.read(name)
    }
}

/// Lowercase hex SHA-256, the digest format `manifest.json` uses.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_without_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json(dir.path(), "model.json", &constant_logistic(2, 0.0));

        let models = ModelDirectory::open(dir.path(), false).expect("open");
        assert!(!models.is_verified());
        assert!(models.exists("model.json"));
        assert!(!models.all_exist(&["model.json", "scaler.json"]));

        let clf = models.classifier("model.json").expect("valid classifier");
        assert!(matches!(clf, ClassifierArtifact::Logistic(_)));
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let models = ModelDirectory::open(dir.path(), false).expect("open");
        let err = models.classifier("absent.json").expect_err("absent");
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_required_manifest_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ModelDirectory::open(dir.path(), true).expect_err("no manifest");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_manifest_binds_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json(dir.path(), "model.json", &constant_logistic(2, 0.0));
        write_json(dir.path(), "extra.json", &json!({"statistics": [1.0]}));
        let digest = sha256_hex(&std::fs::read(dir.path().join("model.json")).expect("read"));
        write_json(
            dir.path(),
            "manifest.json",
            &json!({"version": 1, "files": {"model.json": digest}}),
        );

        let models = ModelDirectory::open(dir.path(), true).expect("open");
        assert!(models.is_verified());
        models.classifier("model.json").expect("bound and intact");

        let unbound = models.imputer("extra.json").expect_err("not in manifest");
        assert!(matches!(unbound, ArtifactError::Integrity(_)));

        // Tamper after the manifest was written.
        write_json(dir.path(), "model.json", &constant_logistic(2, 3.0));
        let tampered = models.classifier("model.json").expect_err("hash mismatch");
        assert!(tampered.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_unsupported_manifest_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json(
            dir.path(),
            "manifest.json",
            &json!({"version": 2, "files": {"a.json": "00"}}),
        );
        assert!(ModelDirectory::open(dir.path(), false).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "ab"));
    }
}
