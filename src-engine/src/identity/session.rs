//! Anonymous per-client session identity

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kv::KeyValueStore;
use crate::error::MindhubError;

/// Storage key holding the persisted session id
pub const SESSION_KEY: &str = "mindhub_session";

/// Opaque anonymous client token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random token (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct Resolved {
    id: SessionId,
    ephemeral: bool,
}

/// Resolves the client's session id once and hands out the same value after
///
/// Storage is consulted on first use only. If it fails, the identity for the
/// rest of this process is a random token that is never written anywhere.
pub struct SessionIdentity<S> {
    storage: S,
    resolved: OnceCell<Resolved>,
}

impl<S: KeyValueStore> SessionIdentity<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            resolved: OnceCell::new(),
        }
    }

    pub fn get_or_create(&self) -> SessionId {
        self.resolve().id.clone()
    }

    /// True when storage was unavailable and the id will not outlive this run
    pub fn is_ephemeral(&self) -> bool {
        self.resolve().ephemeral
    }

    fn resolve(&self) -> &Resolved {
        self.resolved.get_or_init(|| match self.load_or_create() {
            Ok(id) => Resolved {
                id,
                ephemeral: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "falling back to an ephemeral session id");
                Resolved {
                    id: SessionId::generate(),
                    ephemeral: true,
                }
            }
        })
    }

    fn load_or_create(&self) -> Result<SessionId, MindhubError> {
        let unavailable = |e: anyhow::Error| MindhubError::StorageUnavailable(format!("{:#}", e));

        let candidate = SessionId::generate();
        // A blank value counts as absent
        let stored = self
            .storage
            .get_or_replace(SESSION_KEY, candidate.as_str(), &|v| v.trim().is_empty())
            .map_err(unavailable)?;

        if stored == candidate.as_str() {
            tracing::info!(session_id = %candidate, "created session id");
        }
        Ok(SessionId(stored))
    }
}
