use crate::domain::model::Session;
use crate::domain::ports::{ConfigProvider, Filter, Query, RecordStore};
use crate::utils::error::{MigrateError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// [`RecordStore`] over a PostgREST endpoint (`{base}/rest/v1/{table}`).
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl RestStore {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds() {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.store_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
            bearer: config.api_key().to_string(),
        })
    }

    /// Sends the session's access token instead of the anonymous key.
    pub fn with_session(mut self, session: &Session) -> Self {
        self.bearer = session.token.clone();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        tracing::debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer))
    }

    async fn check(table: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        tracing::debug!("Store error on '{}' ({}): {}", table, status, body);
        Err(MigrateError::StoreError {
            table: table.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

/// Query-string pairs in PostgREST syntax (`col=eq.value`).
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];
    for filter in &query.filters {
        match filter {
            Filter::Eq(column, value) => {
                params.push((column.clone(), format!("eq.{}", param_value(value))))
            }
            Filter::ILike(column, pattern) => {
                params.push((column.clone(), format!("ilike.{}", pattern)))
            }
        }
    }
    if let Some(order) = &query.order_by {
        params.push(("order".to_string(), format!("{}.asc", order)));
    }
    params
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Total from a `Content-Range` header such as `0-24/25` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let from_json = serde_json::from_str::<Value>(trimmed).ok().and_then(|json| {
        ["message", "error_description", "msg", "error"]
            .iter()
            .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(str::to_string))
    });
    Some(from_json.unwrap_or_else(|| trimmed.to_string()))
}

#[async_trait]
impl RecordStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let response = self
            .request(Method::GET, &query.table)
            .query(&query_params(query))
            .send()
            .await?;
        let response = Self::check(&query.table, response).await?;
        let rows: Vec<Value> = response.json().await?;
        tracing::debug!("Fetched {} rows from '{}'", rows.len(), query.table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        tracing::debug!("Inserting {} rows into '{}'", rows.len(), table);
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let response = self
            .request(Method::HEAD, &query.table)
            .header("Prefer", "count=exact")
            .query(&query_params(query))
            .send()
            .await?;
        let response = Self::check(&query.table, response).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| MigrateError::StoreError {
                table: query.table.clone(),
                status: response.status().as_u16(),
                message: "response has no usable Content-Range header".to_string(),
            })
    }
}
