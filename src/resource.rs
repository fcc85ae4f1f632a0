use crate::bundle::{self, Bundle};
use crate::config::BundleProps;
use crate::context::{Context, Outcome, Phase};
use crate::engine::BundlingEngine;
use crate::error::BundleError;
use crate::state::StateStore;

/// Options controlling how a [`Resource`] reacts to an update.
#[derive(Debug, Clone, Copy)]
pub struct ResourceOptions {
    /// Rebuild on every update, even if the props are unchanged. Sources are
    /// never inspected, so turning this off means edits to the entry point
    /// go unnoticed until the props change.
    pub always_update: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            always_update: true,
        }
    }
}

/// Drives bundle resources against a state store, picking the phase for
/// each invocation.
///
/// An id with no recorded state is created, an id with state is updated.
/// Successful builds record `props` and `bundle` next to the `metafile` and
/// `hash` written by the build itself.
pub struct Resource<E, S> {
    engine: E,
    state: S,
    options: ResourceOptions,
}

impl<E, S> Resource<E, S>
where
    E: BundlingEngine,
    S: StateStore,
{
    pub fn new(engine: E, state: S) -> Self {
        Self {
            engine,
            state,
            options: ResourceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Creates or updates the bundle identified by `id`.
    pub async fn apply(&self, id: &str, props: &BundleProps) -> Result<Bundle, BundleError> {
        props.out_dir_path()?;

        let phase = match self.state.contains(id).await? {
            true => Phase::Update,
            false => Phase::Create,
        };

        let ctx = Context::new(id, phase, &self.state);

        if phase == Phase::Update && !self.options.always_update {
            if let Some(bundle) = self.unchanged(&ctx, props).await? {
                tracing::info!("{id} is unchanged, skipping build");
                return Ok(bundle);
            }
        }

        tracing::info!("{id}: {phase:?}");
        let bundle = bundle::build(&ctx, &self.engine, props).await?;

        ctx.set("props", props).await?;
        ctx.set("bundle", &bundle).await?;

        Ok(bundle)
    }

    /// Tears down the bundle identified by `id`: empties its output directory
    /// and forgets its state.
    pub async fn destroy(&self, id: &str, props: &BundleProps) -> Result<(), BundleError> {
        let ctx = Context::new(id, Phase::Delete, &self.state);

        tracing::info!("{id}: Delete");
        if let Outcome::Destroyed = bundle::execute(ctx, &self.engine, props).await? {
            self.state.remove(id).await?;
        }

        Ok(())
    }

    async fn unchanged(
        &self,
        ctx: &Context<'_>,
        props: &BundleProps,
    ) -> Result<Option<Bundle>, BundleError> {
        let previous: Option<BundleProps> = ctx.get("props").await?;
        if previous.as_ref() != Some(props) {
            return Ok(None);
        }

        Ok(ctx.get("bundle").await?)
    }
}
