use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

use crate::engine::Diagnostics;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Invalid bundle configuration.\n{0}")]
    Configuration(String),

    #[error("Error while bundling.\n{0}")]
    Build(#[from] EngineError),

    #[error("Unable to find a compiled file for entry point '{entry_point}'")]
    Resolution { entry_point: String },

    #[error("Filesystem error at '{}'.\n{source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't persist resource state.\n{0}")]
    State(#[from] StateError),
}

impl BundleError {
    /// Annotates an I/O error with the path it occurred at.
    pub(crate) fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| BundleError::Io { path, source }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine ran and reported compilation errors.
    #[error("{0}")]
    Failed(Diagnostics),

    #[error("Couldn't spawn '{program}'.\n{source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited without producing a result document.
    #[error("Engine exited with {status}.\n{stderr}")]
    Crashed { status: ExitStatus, stderr: String },

    #[error("Couldn't decode engine output.\n{0}")]
    Decode(#[from] serde_json::Error),

    #[error("An error occured in the bundling engine.\n{0}")]
    Userland(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Couldn't access state file '{}'.\n{source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't convert state value '{key}'.\n{source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
