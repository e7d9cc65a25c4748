//! Location of the pinned intake API schema snapshots.

use std::path::{Path, PathBuf};

use crate::types::SpecGeneration;

/// Default spec directory of the earliest supported snapshot.
pub const EARLIEST_SUPPORTED_SPEC_DIR: &str = "earliest_supported/docs/spec";

/// Default spec directory of the latest used snapshot.
pub const LATEST_USED_SPEC_DIR: &str = "latest_used/docs/spec";

/// Where schema documents live on disk.
///
/// Every snapshot directory is relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecsConfig {
    /// Directory holding both snapshots.
    pub root: PathBuf,
    /// Spec directory of the earliest supported snapshot, relative to `root`.
    pub earliest_dir: PathBuf,
    /// Spec directory of the latest used snapshot, relative to `root`.
    pub latest_dir: PathBuf,
}

impl SpecsConfig {
    /// Use the standard snapshot layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            earliest_dir: PathBuf::from(EARLIEST_SUPPORTED_SPEC_DIR),
            latest_dir: PathBuf::from(LATEST_USED_SPEC_DIR),
        }
    }

    /// Override the earliest snapshot's spec directory.
    pub fn earliest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.earliest_dir = dir.into();
        self
    }

    /// Override the latest snapshot's spec directory.
    pub fn latest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.latest_dir = dir.into();
        self
    }

    /// Spec directory for a generation.
    pub fn spec_dir(&self, generation: SpecGeneration) -> PathBuf {
        match generation {
            SpecGeneration::Earliest => self.root.join(&self.earliest_dir),
            SpecGeneration::Latest => self.root.join(&self.latest_dir),
        }
    }

    /// Path of a schema document inside a generation's spec directory.
    pub fn schema_path(&self, generation: SpecGeneration, relative: impl AsRef<Path>) -> PathBuf {
        self.spec_dir(generation).join(relative)
    }
}
