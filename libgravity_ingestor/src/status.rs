use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Which part of an ingestion is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Loading,
    Matching,
    Copying,
    Exporting,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading"),
            Self::Matching => write!(f, "Matching"),
            Self::Copying => write!(f, "Copying"),
            Self::Exporting => write!(f, "Exporting"),
        }
    }
}

/// Progress through the current stage, from 0.0 to 1.0
#[derive(Debug, Clone, Default)]
pub struct IngestStatus {
    pub progress: f32,
    pub stage: Stage,
}

impl IngestStatus {
    pub fn new(progress: f32, stage: Stage) -> Self {
        Self { progress, stage }
    }
}

/// A file or action left out of a batch, and why
#[derive(Debug, Clone, PartialEq)]
pub struct SkipNote {
    pub subject: PathBuf,
    pub reason: String,
}

impl SkipNote {
    pub fn new(subject: &Path, reason: impl Display) -> Self {
        Self {
            subject: subject.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl Display for SkipNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject.to_string_lossy(), self.reason)
    }
}
