//! Runtime choice between the hosted and the local table store

use serde_json::Value;

use super::local::LocalStore;
use super::remote::{RemoteError, RemoteStore, Select, Table};
use super::rest::RestStore;
use crate::config::Config;

#[derive(Debug, Clone)]
pub enum Backend {
    Local(LocalStore),
    Rest(RestStore),
}

impl Backend {
    /// Hosted store when configured, otherwise tables under the data dir
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        match &config.remote {
            Some(remote) => {
                tracing::debug!(url = %remote.url, "using hosted mood store");
                Ok(Backend::Rest(RestStore::new(&remote.url, &remote.api_key)?))
            }
            None => {
                tracing::debug!(dir = %config.data_dir.display(), "using local mood store");
                Ok(Backend::Local(LocalStore::new(&config.data_dir)))
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Backend::Local(_) => "local",
            Backend::Rest(_) => "hosted",
        }
    }
}

impl RemoteStore for Backend {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, RemoteError> {
        match self {
            Backend::Local(store) => store.insert(table, record).await,
            Backend::Rest(store) => store.insert(table, record).await,
        }
    }

    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        match self {
            Backend::Local(store) => store.select(query).await,
            Backend::Rest(store) => store.select(query).await,
        }
    }
}
