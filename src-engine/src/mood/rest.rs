//! PostgREST-compatible HTTP backend (the hosted `mood_logs` and
//! `community_posts` tables)

use chrono::SecondsFormat;
use reqwest::{Client, Response};
use serde_json::Value;

use super::remote::{RemoteError, RemoteStore, Select, SortOrder, Table};

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("mindhub-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    /// PostgREST query string for a select
    pub fn query_params(query: &Select) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "*".to_string())];
        if let Some(session_id) = &query.filter.session_id {
            params.push(("session_id", format!("eq.{}", session_id)));
        }
        if let Some(range) = &query.filter.created_at {
            params.push((
                "created_at",
                format!("gte.{}", range.start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ));
            params.push((
                "created_at",
                format!("lt.{}", range.end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ));
        }
        let direction = match query.order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        params.push(("order", format!("created_at.{}", direction)));
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_rows(response: Response) -> Result<Vec<Value>, RemoteError> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

impl RemoteStore for RestStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, RemoteError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        let rows = decode_rows(ensure_success(response).await?).await?;
        rows.into_iter().next().ok_or_else(|| {
            RemoteError::Unavailable(format!("insert into {} returned no row", table))
        })
    }

    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        let response = self
            .client
            .get(self.table_url(query.table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&Self::query_params(query))
            .send()
            .await?;

        decode_rows(ensure_success(response).await?).await
    }
}
