#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use esbundle::{BuildOptions, BuildOutput, BundlingEngine, Diagnostics, EngineError, Metafile};
use serde_json::json;

/// Engine standing in for esbuild. Writes `<outdir>/<stem>.js` (or the
/// outfile) plus a source map, and reports them in a metafile.
#[derive(Default)]
pub struct ScriptedEngine {
    source: Mutex<String>,
    calls: Mutex<Vec<BuildOptions>>,
    dir_existed: Mutex<Vec<bool>>,
    reported_entry: Option<String>,
    failure: Option<Diagnostics>,
}

impl ScriptedEngine {
    pub fn new(source: &str) -> Self {
        Self {
            source: Mutex::new(source.to_string()),
            ..Default::default()
        }
    }

    /// Report every output as compiled from `entry` instead of the real one.
    pub fn reporting_entry(mut self, entry: &str) -> Self {
        self.reported_entry = Some(entry.to_string());
        self
    }

    pub fn failing(mut self, diagnostics: Diagnostics) -> Self {
        self.failure = Some(diagnostics);
        self
    }

    pub fn set_source(&self, source: &str) {
        *self.source.lock().unwrap() = source.to_string();
    }

    pub fn calls(&self) -> Vec<BuildOptions> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dir_existed(&self) -> Vec<bool> {
        self.dir_existed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BundlingEngine for ScriptedEngine {
    async fn build(&self, options: &BuildOptions) -> Result<BuildOutput, EngineError> {
        self.calls.lock().unwrap().push(options.clone());

        let output = match (&options.outfile, &options.outdir) {
            (Some(outfile), _) => outfile.clone(),
            (None, Some(outdir)) => {
                let stem = Utf8Path::new(&options.entry_points[0])
                    .file_stem()
                    .unwrap_or("out");
                outdir.join(stem).with_extension("js")
            }
            (None, None) => return Err(anyhow::anyhow!("no output location").into()),
        };

        let dir = output.parent().unwrap_or(Utf8Path::new("."));
        self.dir_existed.lock().unwrap().push(dir.is_dir());

        if let Some(diagnostics) = &self.failure {
            return Err(EngineError::Failed(diagnostics.clone()));
        }

        let source = self.source.lock().unwrap().clone();
        let map = Utf8PathBuf::from(format!("{output}.map"));
        std::fs::write(&output, &source).map_err(anyhow::Error::from)?;
        std::fs::write(&map, "{}").map_err(anyhow::Error::from)?;

        let entry = self
            .reported_entry
            .clone()
            .unwrap_or_else(|| options.entry_points[0].clone());

        let metafile: Metafile = serde_json::from_value(json!({
            "inputs": {
                entry.clone(): { "bytes": 0, "imports": [] }
            },
            "outputs": {
                map.as_str(): { "bytes": 2 },
                output.as_str(): { "bytes": source.len(), "entryPoint": entry, "exports": [] }
            }
        }))
        .map_err(anyhow::Error::from)?;

        Ok(BuildOutput::from(metafile))
    }
}

pub struct Workspace {
    _dir: tempfile::TempDir,
    pub root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(
            root.join("src/handler.ts"),
            "export const handler = () => new Response('ok');\n",
        )
        .unwrap();

        Self { _dir: dir, root }
    }

    pub fn entries(&self, dir: &str) -> usize {
        std::fs::read_dir(self.root.join(dir)).unwrap().count()
    }
}
