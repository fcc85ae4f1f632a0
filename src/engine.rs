//! The seam between this crate and the bundler doing the actual work.

use std::fmt;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{Format, Platform, Sourcemap, Target};
use crate::error::EngineError;

/// A bundler which can compile a single entry point to disk.
///
/// The engine is opaque: module resolution, transpilation and tree-shaking
/// all happen behind [`BundlingEngine::build`]. The only thing this crate
/// needs back is the manifest of written outputs.
#[async_trait]
pub trait BundlingEngine: Send + Sync {
    async fn build(&self, options: &BuildOptions) -> Result<BuildOutput, EngineError>;
}

/// Options handed to the engine, serialized in the shape of esbuild's
/// `BuildOptions` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub entry_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outfile: Option<Utf8PathBuf>,
    pub bundle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<Sourcemap>,
    pub external: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub metafile: bool,
    pub write: bool,
    /// Pass-through options. Never contains any of [`BuildOptions::OWNED_KEYS`].
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildOptions {
    /// Keys controlled by the typed fields above.
    pub const OWNED_KEYS: &'static [&'static str] = &[
        "entryPoints",
        "outdir",
        "outfile",
        "bundle",
        "format",
        "target",
        "minify",
        "sourcemap",
        "external",
        "platform",
        "metafile",
        "write",
    ];
}

/// Everything an engine reports back after a successful build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub metafile: Metafile,
    pub written_files: Vec<Utf8PathBuf>,
}

impl From<Metafile> for BuildOutput {
    fn from(metafile: Metafile) -> Self {
        let written_files = metafile.outputs.keys().map(Utf8PathBuf::from).collect();
        Self {
            metafile,
            written_files,
        }
    }
}

/// Build manifest as produced by esbuild's `metafile` option.
///
/// Stored verbatim; only `outputs[*].entryPoint` is interpreted. The output
/// map keeps the order the engine listed the files in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metafile {
    #[serde(default)]
    pub inputs: IndexMap<String, Value>,
    #[serde(default)]
    pub outputs: IndexMap<String, MetafileOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafileOutput {
    /// Entry point this output was compiled from, absent for chunks and
    /// source maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Metafile {
    /// Finds the output compiled from `entry_point`.
    ///
    /// Entry points are compared as plain strings. Should the manifest list
    /// more than one matching output, the first one wins.
    pub fn output_for(&self, entry_point: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|(_, output)| output.entry_point.as_deref() == Some(entry_point))
            .map(|(path, _)| path.as_str())
    }
}

/// Messages reported by a failed build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub errors: Vec<Message>,
    #[serde(default)]
    pub warnings: Vec<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub plugin_name: String,
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub detail: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub line_text: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Message {
    fn write(&self, f: &mut fmt::Formatter<'_>, level: &str) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}:{}:{}: {level}: {}",
                loc.file, loc.line, loc.column, self.text
            )?,
            None => write!(f, "{level}: {}", self.text)?,
        }

        for note in &self.notes {
            write!(f, "\n  note: {}", note.text)?;
        }

        Ok(())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.iter().map(|m| (m, "error"));
        let warnings = self.warnings.iter().map(|m| (m, "warning"));

        for (i, (message, level)) in errors.chain(warnings).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            message.write(f, level)?;
        }

        Ok(())
    }
}
