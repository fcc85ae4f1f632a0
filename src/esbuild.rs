//! [`BundlingEngine`] backed by esbuild's JavaScript API.
//!
//! The build options are handed to a short ES module which calls
//! `esbuild.build()` and prints the resulting metafile as JSON. The module
//! runs under Deno (pulling esbuild from npm on demand) or Node (using the
//! project's own `esbuild` package).

use std::fmt;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::engine::{BuildOptions, BuildOutput, BundlingEngine, Diagnostics, Metafile};
use crate::error::EngineError;

/// esbuild release requested from npm when running under Deno.
pub const DEFAULT_VERSION: &str = "0.25.11";

const SCRIPT: &str = r#"
import { build, stop } from "__ESBUILD__";

const isDeno = typeof Deno !== "undefined";
const args = isDeno ? Deno.args : process.argv;
const exit = (code) => (isDeno ? Deno.exit(code) : process.exit(code));

const options = JSON.parse(args[args.length - 1]);

try {
    const result = await build(options);
    console.log(JSON.stringify({ metafile: result.metafile }));
} catch (e) {
    if (!Array.isArray(e?.errors)) throw e;
    console.log(JSON.stringify({ errors: e.errors, warnings: e.warnings ?? [] }));
    await stop?.();
    exit(1);
}

await stop?.();
"#;

/// JavaScript runtime used to drive esbuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Deno,
    Node,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runtime::Deno => f.write_str("deno"),
            Runtime::Node => f.write_str("node"),
        }
    }
}

/// The esbuild engine.
///
/// **Note:** requires the selected runtime binary to be available in the
/// system PATH, or configured with [`Esbuild::program`]. Under Node the
/// `esbuild` package must be resolvable from the working directory.
///
/// ```rust
/// use esbundle::{Esbuild, Runtime};
///
/// let engine = Esbuild::node().program("/usr/local/bin/node");
/// assert_eq!(engine.runtime(), Runtime::Node);
/// ```
#[derive(Debug, Clone)]
pub struct Esbuild {
    runtime: Runtime,
    program: String,
    version: String,
}

impl Default for Esbuild {
    fn default() -> Self {
        Self::deno()
    }
}

impl Esbuild {
    pub fn deno() -> Self {
        Self {
            runtime: Runtime::Deno,
            program: "deno".into(),
            version: DEFAULT_VERSION.into(),
        }
    }

    pub fn node() -> Self {
        Self {
            runtime: Runtime::Node,
            program: "node".into(),
            version: DEFAULT_VERSION.into(),
        }
    }

    /// Path to the runtime executable.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// esbuild version, only used under Deno.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    fn script(&self) -> String {
        let specifier = match self.runtime {
            Runtime::Deno => format!("npm:esbuild@{}", self.version),
            Runtime::Node => "esbuild".to_string(),
        };

        SCRIPT.replace("__ESBUILD__", &specifier)
    }

    fn command(&self, options: &str) -> Command {
        let mut cmd = Command::new(&self.program);

        match self.runtime {
            Runtime::Deno => cmd
                .arg("run")
                .arg("--quiet")
                .arg("--allow-env")
                .arg("--allow-read")
                .arg("--allow-write")
                .arg("--allow-run")
                .arg("-"),
            Runtime::Node => cmd.arg("--input-type=module").arg("-"),
        };

        cmd.arg(options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl BundlingEngine for Esbuild {
    async fn build(&self, options: &BuildOptions) -> Result<BuildOutput, EngineError> {
        let json = serde_json::to_string(options)?;
        tracing::debug!("running esbuild through {}", self.runtime);

        let mut child = self
            .command(&json)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let script = self.script();
            let written = stdin.write_all(script.as_bytes()).await;
            drop(stdin);
            written.map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        decode(output.status, &output.stdout, &output.stderr)
    }
}

#[derive(Deserialize)]
struct Reply {
    metafile: Metafile,
}

fn decode(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<BuildOutput, EngineError> {
    let stdout = String::from_utf8_lossy(stdout);
    let stdout = stdout.trim();

    if status.success() {
        let reply: Reply = serde_json::from_str(stdout)?;
        return Ok(BuildOutput::from(reply.metafile));
    }

    match serde_json::from_str::<Diagnostics>(stdout) {
        Ok(diagnostics) if !diagnostics.errors.is_empty() => Err(EngineError::Failed(diagnostics)),
        _ => Err(EngineError::Crashed {
            status,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_specifier() {
        let deno = Esbuild::deno().version("0.24.0").script();
        assert!(deno.contains(r#"from "npm:esbuild@0.24.0""#));

        let node = Esbuild::node().script();
        assert!(node.contains(r#"from "esbuild""#));
        assert!(!node.contains("__ESBUILD__"));
    }

    #[test]
    fn test_command_args() {
        let cmd = Esbuild::node().program("/opt/node").command("{}");
        let cmd = cmd.as_std();

        assert_eq!(cmd.get_program(), "/opt/node");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--input-type=module", "-", "{}"]);
    }

    #[cfg(unix)]
    mod decode {
        use std::os::unix::process::ExitStatusExt;

        use super::*;

        #[test]
        fn test_decode_success() {
            let stdout = br#"{"metafile":{"inputs":{},"outputs":{"out/a.js":{"bytes":1,"entryPoint":"src/a.ts"}}}}"#;
            let output = decode(ExitStatus::from_raw(0), stdout, b"").unwrap();

            assert_eq!(output.metafile.output_for("src/a.ts"), Some("out/a.js"));
            assert_eq!(output.written_files, ["out/a.js"]);
        }

        #[test]
        fn test_decode_build_failure() {
            let stdout = br#"{"errors":[{"text":"Unexpected end of file","location":{"file":"src/a.ts","line":1,"column":4}}],"warnings":[]}"#;
            let err = decode(ExitStatus::from_raw(1 << 8), stdout, b"").unwrap_err();

            let diagnostics = match err {
                EngineError::Failed(diagnostics) => diagnostics,
                other => panic!("expected build failure, got {other:?}"),
            };
            assert_eq!(diagnostics.errors[0].text, "Unexpected end of file");
            assert_eq!(diagnostics.errors[0].location.as_ref().unwrap().line, 1);
        }

        #[test]
        fn test_decode_crash() {
            let err = decode(ExitStatus::from_raw(1 << 8), b"", b"module not found").unwrap_err();

            assert!(
                matches!(err, EngineError::Crashed { ref stderr, .. } if stderr == "module not found")
            );
        }
    }
}
