//! Artifact Store: persisted scaler, model and feature schema
//!
//! A bundle is three JSON files plus a manifest holding their SHA-256
//! checksums. Saving writes every file to a `.tmp` sibling, fsyncs, then
//! renames, with the manifest renamed last. Loading verifies the checksums
//! and that the three pieces agree on the number of features.

use crate::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use crate::svm::SvcModel;
use crate::training::TrainingReport;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const FEATURES_FILE: &str = "feature_names.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current bundle layout
pub const BUNDLE_VERSION: u32 = 1;

/// Name of the default model directory
pub const DEFAULT_MODEL_DIR: &str = "model";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize {name}: {source}")]
    Serialize {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent bundle: {0}")]
    Inconsistent(String),
}

impl ArtifactError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Checksums and provenance of a saved bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub bundle_version: u32,
    pub created_at: DateTime<Utc>,
    /// File name → SHA-256 hex digest
    pub files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingReport>,
}

/// Scaler, model and schema that belong together
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub scaler: StandardScaler,
    pub model: SvcModel,
    pub schema: FeatureSchema,
    /// Present when the bundle was loaded with a manifest
    pub manifest: Option<BundleManifest>,
}

impl ArtifactBundle {
    /// Assemble a bundle, checking that every piece has the same width
    pub fn new(
        scaler: StandardScaler,
        model: SvcModel,
        schema: FeatureSchema,
    ) -> Result<Self, ArtifactError> {
        check_dimensions(&scaler, &model, &schema).map_err(ArtifactError::Inconsistent)?;
        Ok(Self {
            scaler,
            model,
            schema,
            manifest: None,
        })
    }

    pub fn n_features(&self) -> usize {
        self.schema.len()
    }
}

fn check_dimensions(
    scaler: &StandardScaler,
    model: &SvcModel,
    schema: &FeatureSchema,
) -> Result<(), String> {
    if schema.is_empty() {
        return Err("feature schema is empty".to_string());
    }
    if scaler.n_features() != schema.len() {
        return Err(format!(
            "scaler has {} features but schema has {}",
            scaler.n_features(),
            schema.len()
        ));
    }
    if model.n_features() != schema.len() {
        return Err(format!(
            "model has {} features but schema has {}",
            model.n_features(),
            schema.len()
        ));
    }
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Pick the model directory.
///
/// An explicit directory wins. Otherwise the workspace-root `model/` and
/// then `./model` are tried; if neither exists the last candidate is
/// returned so a subsequent load reports a concrete missing path.
pub fn resolve_model_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let candidates = [
        workspace_root.join(DEFAULT_MODEL_DIR),
        PathBuf::from(DEFAULT_MODEL_DIR),
    ];

    for candidate in &candidates {
        if candidate.is_dir() {
            debug!(dir = %candidate.display(), "Resolved model directory");
            return candidate.clone();
        }
    }
    PathBuf::from(DEFAULT_MODEL_DIR)
}

/// Reads and writes artifact bundles in one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load and verify the bundle. Any failure here is fatal for serving.
    pub fn load(&self) -> Result<ArtifactBundle, ArtifactError> {
        let mut raw = BTreeMap::new();
        for name in [SCALER_FILE, MODEL_FILE, FEATURES_FILE] {
            raw.insert(name, self.read_required(name)?);
        }

        let manifest = self.read_manifest()?;
        match &manifest {
            Some(manifest) => self.verify_checksums(manifest, &raw)?,
            None => warn!(
                dir = %self.dir.display(),
                "No bundle manifest found; loading artifacts unverified"
            ),
        }

        let scaler: StandardScaler = self.decode(SCALER_FILE, &raw[SCALER_FILE])?;
        let model: SvcModel = self.decode(MODEL_FILE, &raw[MODEL_FILE])?;
        let schema: FeatureSchema = self.decode(FEATURES_FILE, &raw[FEATURES_FILE])?;

        scaler.validate().map_err(|e| ArtifactError::Corrupt {
            path: self.path(SCALER_FILE),
            reason: e.to_string(),
        })?;
        model.validate().map_err(|e| ArtifactError::Corrupt {
            path: self.path(MODEL_FILE),
            reason: e.to_string(),
        })?;
        check_dimensions(&scaler, &model, &schema).map_err(|reason| ArtifactError::Corrupt {
            path: self.dir.clone(),
            reason,
        })?;

        info!(
            dir = %self.dir.display(),
            features = schema.len(),
            support_vectors = model.n_support(),
            verified = manifest.is_some(),
            "Loaded artifact bundle"
        );

        Ok(ArtifactBundle {
            scaler,
            model,
            schema,
            manifest,
        })
    }

    /// Persist a bundle, replacing any previous one
    pub fn save(
        &self,
        bundle: &ArtifactBundle,
        report: Option<&TrainingReport>,
    ) -> Result<BundleManifest, ArtifactError> {
        // Serialize everything before touching disk
        let payloads = [
            (SCALER_FILE, encode(SCALER_FILE, &bundle.scaler)?),
            (MODEL_FILE, encode(MODEL_FILE, &bundle.model)?),
            (FEATURES_FILE, encode(FEATURES_FILE, &bundle.schema)?),
        ];

        let manifest = BundleManifest {
            bundle_version: BUNDLE_VERSION,
            created_at: Utc::now(),
            files: payloads
                .iter()
                .map(|(name, data)| (name.to_string(), compute_checksum(data)))
                .collect(),
            training: report.cloned(),
        };
        let manifest_bytes = encode(MANIFEST_FILE, &manifest)?;

        fs::create_dir_all(&self.dir).map_err(|e| ArtifactError::io(&self.dir, e))?;

        let mut staged = Vec::with_capacity(payloads.len() + 1);
        for (name, data) in payloads
            .iter()
            .map(|(n, d)| (*n, d.as_slice()))
            .chain(std::iter::once((MANIFEST_FILE, manifest_bytes.as_slice())))
        {
            match self.write_temp(name, data) {
                Ok(temp) => staged.push((temp, self.path(name))),
                Err(e) => {
                    for (temp, _) in &staged {
                        let _ = fs::remove_file(temp);
                    }
                    let _ = fs::remove_file(self.temp_path(name));
                    return Err(e);
                }
            }
        }

        // Manifest is last in `staged`, so it is renamed last
        for (temp, path) in &staged {
            fs::rename(temp, path).map_err(|e| ArtifactError::io(path, e))?;
        }

        info!(
            dir = %self.dir.display(),
            files = manifest.files.len(),
            "Saved artifact bundle"
        );

        Ok(manifest)
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.tmp", name))
    }

    fn write_temp(&self, name: &str, data: &[u8]) -> Result<PathBuf, ArtifactError> {
        let temp_path = self.temp_path(name);
        let mut file = File::create(&temp_path).map_err(|e| ArtifactError::io(&temp_path, e))?;
        file.write_all(data)
            .map_err(|e| ArtifactError::io(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| ArtifactError::io(&temp_path, e))?;
        Ok(temp_path)
    }

    fn read_required(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path(name);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ArtifactError::Missing { path }),
            Err(e) => Err(ArtifactError::Io { path, source: e }),
        }
    }

    fn read_manifest(&self) -> Result<Option<BundleManifest>, ArtifactError> {
        let path = self.path(MANIFEST_FILE);
        match fs::read(&path) {
            Ok(data) => self.decode(MANIFEST_FILE, &data).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::Io { path, source: e }),
        }
    }

    fn verify_checksums(
        &self,
        manifest: &BundleManifest,
        raw: &BTreeMap<&str, Vec<u8>>,
    ) -> Result<(), ArtifactError> {
        for (name, data) in raw {
            let path = self.path(name);
            let expected = manifest
                .files
                .get(*name)
                .ok_or_else(|| ArtifactError::Corrupt {
                    path: path.clone(),
                    reason: "not listed in manifest".to_string(),
                })?;
            let actual = compute_checksum(data);
            if &actual != expected {
                return Err(ArtifactError::Corrupt {
                    path,
                    reason: format!("checksum mismatch: expected {}, got {}", expected, actual),
                });
            }
        }
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, name: &str, data: &[u8]) -> Result<T, ArtifactError> {
        serde_json::from_slice(data).map_err(|e| ArtifactError::Corrupt {
            path: self.path(name),
            reason: e.to_string(),
        })
    }
}

fn encode<T: Serialize>(name: &'static str, value: &T) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize { name, source })
}
