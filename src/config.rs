//! Typed bundle configuration.
//!
//! [`BundleProps`] mirrors the JSON shape esbuild users already know
//! (`entryPoint`, `outdir`, `outfile`, ...), so it can be deserialized from a
//! resource manifest as well as built in code through chained setters.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BundleError;

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Immediately invoked function expression.
    Iife,
    /// CommonJS.
    Cjs,
    /// ECMAScript modules.
    Esm,
}

/// Environment the bundle is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Browser,
    Node,
    Neutral,
}

/// Language target, e.g. `node18` or `["es2020", "chrome100"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::One(value.to_string())
    }
}

impl From<Vec<String>> for Target {
    fn from(value: Vec<String>) -> Self {
        Target::Many(value)
    }
}

/// Source map generation mode.
///
/// Serialized the way esbuild expects it: `false`, `true`, or one of the
/// strings `"inline"`, `"external"`, `"both"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SourcemapRepr", into = "SourcemapRepr")]
pub enum Sourcemap {
    Disabled,
    /// Separate `.map` file linked from the bundle with a comment.
    Linked,
    /// Source map embedded in the bundle.
    Inline,
    /// Separate `.map` file without a link comment.
    External,
    /// Both inline and external.
    Both,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SourcemapRepr {
    Flag(bool),
    Mode(String),
}

impl TryFrom<SourcemapRepr> for Sourcemap {
    type Error = String;

    fn try_from(value: SourcemapRepr) -> Result<Self, Self::Error> {
        match value {
            SourcemapRepr::Flag(false) => Ok(Sourcemap::Disabled),
            SourcemapRepr::Flag(true) => Ok(Sourcemap::Linked),
            SourcemapRepr::Mode(mode) => match mode.as_str() {
                "linked" => Ok(Sourcemap::Linked),
                "inline" => Ok(Sourcemap::Inline),
                "external" => Ok(Sourcemap::External),
                "both" => Ok(Sourcemap::Both),
                other => Err(format!("unknown sourcemap mode '{other}'")),
            },
        }
    }
}

impl From<Sourcemap> for SourcemapRepr {
    fn from(value: Sourcemap) -> Self {
        match value {
            Sourcemap::Disabled => SourcemapRepr::Flag(false),
            Sourcemap::Linked => SourcemapRepr::Flag(true),
            Sourcemap::Inline => SourcemapRepr::Mode("inline".into()),
            Sourcemap::External => SourcemapRepr::Mode("external".into()),
            Sourcemap::Both => SourcemapRepr::Mode("both".into()),
        }
    }
}

/// Properties of a single bundle resource.
///
/// # Example
///
/// ```rust
/// use esbundle::{BundleProps, Format, Platform};
///
/// let props = BundleProps::new("src/handler.ts")
///     .outdir(".out")
///     .format(Format::Esm)
///     .platform(Platform::Node)
///     .target("node18");
///
/// assert_eq!(props.out_dir_path().unwrap(), ".out");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleProps {
    /// Path to the source file to bundle, e.g. `src/handler.ts`.
    pub entry_point: String,

    /// Directory the bundle is written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdir: Option<Utf8PathBuf>,

    /// Full path of the output file. Takes precedence over `outdir` when
    /// resolving the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfile: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<Sourcemap>,

    /// Packages left out of the bundle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Any other esbuild build option, passed through as-is.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl BundleProps {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            ..Default::default()
        }
    }

    pub fn outdir(mut self, outdir: impl Into<Utf8PathBuf>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    pub fn outfile(mut self, outfile: impl Into<Utf8PathBuf>) -> Self {
        self.outfile = Some(outfile.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = Some(minify);
        self
    }

    pub fn sourcemap(mut self, sourcemap: Sourcemap) -> Self {
        self.sourcemap = Some(sourcemap);
        self
    }

    pub fn external<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external.extend(modules.into_iter().map(Into::into));
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets an arbitrary esbuild option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Returns the directory the bundle is written to: the parent of
    /// `outfile` if set, `outdir` otherwise.
    pub fn out_dir_path(&self) -> Result<Utf8PathBuf, BundleError> {
        if let Some(outfile) = &self.outfile {
            return Ok(match outfile.parent() {
                Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
                _ => Utf8Path::new(".").to_owned(),
            });
        }

        if let Some(outdir) = &self.outdir {
            return Ok(outdir.clone());
        }

        let json = serde_json::to_string(self).unwrap_or_default();
        Err(BundleError::Configuration(format!(
            "You need to specify either outfile or outdir in your bundle configuration {json}"
        )))
    }
}
