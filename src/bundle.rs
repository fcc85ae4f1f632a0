//! The bundle resource: turns [`BundleProps`] into an engine build, finds the
//! compiled entry point among the outputs and fingerprints it.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BundleProps;
use crate::context::{Context, Outcome, Phase};
use crate::engine::{BuildOptions, BundlingEngine, Metafile};
use crate::error::BundleError;
use crate::hash::Hash32;
use crate::io::{clean_dir, ensure_dir};

/// Module kept external in every bundle, on top of whatever the props list.
pub const ALWAYS_EXTERNAL: &str = "node:async_hooks";

/// A compiled bundle on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Path of the output compiled from the entry point, as reported by the
    /// engine.
    pub path: Utf8PathBuf,
    /// Hex encoded SHA-256 of the file contents.
    pub hash: String,
}

/// Runs the bundle resource for the phase carried by `ctx`.
///
/// On [`Phase::Delete`] the output directory is emptied and the engine is
/// never called. Any other phase builds the bundle, persisting `metafile`
/// and `hash` into the context.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), esbundle::BundleError> {
/// use esbundle::{BundleProps, Context, Esbuild, Format, MemoryState, Phase, execute};
///
/// let state = MemoryState::new();
/// let ctx = Context::new("handler", Phase::Create, &state);
/// let props = BundleProps::new("src/handler.ts")
///     .outdir(".out")
///     .format(Format::Esm);
///
/// let outcome = execute(ctx, &Esbuild::default(), &props).await?;
/// # Ok(())
/// # }
/// ```
pub async fn execute<E>(
    ctx: Context<'_>,
    engine: &E,
    props: &BundleProps,
) -> Result<Outcome, BundleError>
where
    E: BundlingEngine + ?Sized,
{
    match ctx.phase() {
        Phase::Delete => {
            clean(props).await?;
            Ok(ctx.destroy())
        }
        Phase::Create | Phase::Update => {
            let bundle = build(&ctx, engine, props).await?;
            Ok(ctx.declare(bundle))
        }
    }
}

/// Empties the output directory, keeping the directory itself.
pub async fn clean(props: &BundleProps) -> Result<(), BundleError> {
    let dir = props.out_dir_path()?;

    tracing::info!("cleaning {dir}");
    clean_dir(&dir).await
}

/// Builds the bundle and records its metadata in `ctx`.
pub async fn build<E>(
    ctx: &Context<'_>,
    engine: &E,
    props: &BundleProps,
) -> Result<Bundle, BundleError>
where
    E: BundlingEngine + ?Sized,
{
    let dir = props.out_dir_path()?;
    ensure_dir(&dir).await?;

    tracing::info!("{}: bundling {} into {dir}", ctx.id(), props.entry_point);
    let output = engine.build(&build_options(props)).await?;

    let path = resolve_output(&output.metafile, &props.entry_point)?;
    tracing::debug!("{} compiled to {path}", props.entry_point);

    let hash = Hash32::hash_file(&path)
        .await
        .map_err(BundleError::io(&path))?
        .to_hex();

    ctx.set("metafile", &output.metafile).await?;
    ctx.set("hash", &hash).await?;

    Ok(Bundle { path, hash })
}

/// Translates props into the options handed to the engine.
///
/// Pass-through `options` come first and the typed props are laid over
/// them, so a prop always owns its key even when left unset. The one
/// exception is `external`, see [`external_modules`].
pub fn build_options(props: &BundleProps) -> BuildOptions {
    let mut extra = props.options.clone();
    extra.retain(|key, _| !BuildOptions::OWNED_KEYS.contains(&key.as_str()));

    BuildOptions {
        entry_points: vec![props.entry_point.clone()],
        outdir: props.outdir.clone(),
        outfile: props.outfile.clone(),
        bundle: true,
        format: props.format,
        target: props.target.clone(),
        minify: props.minify,
        sourcemap: props.sourcemap,
        external: external_modules(props),
        platform: props.platform,
        metafile: true,
        write: true,
        extra,
    }
}

/// Merges external modules in order: [`ALWAYS_EXTERNAL`], then
/// `props.external`, then `options.external`. Duplicates are kept.
pub fn external_modules(props: &BundleProps) -> Vec<String> {
    let mut external = vec![ALWAYS_EXTERNAL.to_string()];
    external.extend(props.external.iter().cloned());

    if let Some(Value::Array(nested)) = props.options.get("external") {
        external.extend(nested.iter().filter_map(Value::as_str).map(str::to_string));
    }

    external
}

/// Picks the output compiled from `entry_point`.
pub fn resolve_output(metafile: &Metafile, entry_point: &str) -> Result<Utf8PathBuf, BundleError> {
    metafile
        .output_for(entry_point)
        .map(Utf8PathBuf::from)
        .ok_or_else(|| BundleError::Resolution {
            entry_point: entry_point.to_string(),
        })
}
