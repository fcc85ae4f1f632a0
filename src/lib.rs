#![forbid(unsafe_code)]
//! Declarative esbuild bundles.
//!
//! A bundle resource compiles one entry point with an external bundling
//! engine, locates the compiled file among everything the engine wrote,
//! fingerprints it with SHA-256 and records the engine's metafile for later
//! comparison. Deleting the resource empties its output directory.
//!
//! ```rust,no_run
//! use esbundle::{BundleProps, Esbuild, FileState, Format, Platform, Resource};
//!
//! # async fn run() -> Result<(), esbundle::BundleError> {
//! let resource = Resource::new(Esbuild::default(), FileState::new(".state"));
//!
//! let props = BundleProps::new("src/handler.ts")
//!     .outdir(".out")
//!     .format(Format::Esm)
//!     .platform(Platform::Node)
//!     .target("node18");
//!
//! let bundle = resource.apply("handler", &props).await?;
//! println!("{} {}", bundle.path, bundle.hash);
//!
//! resource.destroy("handler", &props).await?;
//! # Ok(())
//! # }
//! ```

mod bundle;
mod config;
mod context;
mod engine;
mod error;
mod esbuild;
mod hash;
mod io;
mod resource;
mod state;

pub use crate::bundle::{
    ALWAYS_EXTERNAL, Bundle, build, build_options, clean, execute, external_modules,
    resolve_output,
};
pub use crate::config::{BundleProps, Format, Platform, Sourcemap, Target};
pub use crate::context::{Context, Outcome, Phase};
pub use crate::engine::{
    BuildOptions, BuildOutput, BundlingEngine, Diagnostics, Location, Message, Metafile,
    MetafileOutput, Note,
};
pub use crate::error::*;
pub use crate::esbuild::{DEFAULT_VERSION, Esbuild, Runtime};
pub use crate::hash::Hash32;
pub use crate::resource::{Resource, ResourceOptions};
pub use crate::state::{FileState, MemoryState, StateStore};

/// Install a `tracing` subscriber printing to stderr, filtered by `RUST_LOG`
/// and defaulting to `info`. Does nothing if a subscriber is already set.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
