use serde::{Serialize, de::DeserializeOwned};

use crate::bundle::Bundle;
use crate::error::StateError;
use crate::state::StateStore;

/// Lifecycle phase a resource is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Update,
    Delete,
}

/// What a resource invocation declared as its result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Built(Bundle),
    Destroyed,
}

/// Capabilities available to a single resource invocation: the current
/// phase, typed access to the resource's persisted state, and declaring the
/// result.
pub struct Context<'a> {
    id: &'a str,
    phase: Phase,
    state: &'a dyn StateStore,
}

impl<'a> Context<'a> {
    pub fn new(id: &'a str, phase: Phase, state: &'a dyn StateStore) -> Self {
        Self { id, phase, state }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        let Some(value) = self.state.get(self.id, key).await? else {
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StateError::Serde {
                key: key.to_string(),
                source,
            })
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|source| StateError::Serde {
            key: key.to_string(),
            source,
        })?;

        self.state.set(self.id, key, value).await
    }

    pub fn declare(self, bundle: Bundle) -> Outcome {
        Outcome::Built(bundle)
    }

    pub fn destroy(self) -> Outcome {
        Outcome::Destroyed
    }
}

#[cfg(test)]
mod tests {
    use crate::state::MemoryState;

    use super::*;

    #[tokio::test]
    async fn test_typed_round_trip() {
        let state = MemoryState::new();
        let ctx = Context::new("handler", Phase::Create, &state);

        ctx.set("hash", "abc").await.unwrap();
        assert_eq!(ctx.get::<String>("hash").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(ctx.get::<String>("missing").await.unwrap(), None);

        let err = ctx.get::<u32>("hash").await.unwrap_err();
        assert!(matches!(err, StateError::Serde { ref key, .. } if key == "hash"));
    }
}
