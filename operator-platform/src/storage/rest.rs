use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use yaraguard_common::Table;

use crate::config::StoreConfig;
use crate::error::{OperatorError, Result};
use super::{PgChangeFeed, Query, RemoteStore, Subscription};

/// PostgREST-style HTTP client for the hosted store.
pub struct RestStore {
    client: Client,
    base_url: String,
    feed: Option<PgChangeFeed>,
}

impl RestStore {
    pub fn new(config: &StoreConfig, feed: Option<PgChangeFeed>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", config.api_key))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            feed,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| OperatorError::Config(format!("store.api_key is not a valid header: {}", e)))
}

fn check_status(table: Table, response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(OperatorError::store(table, format!("request failed with {}", status)))
    }
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/42`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.table_url(query.table))
            .query(&query.to_params())
            .send()
            .await?;
        check_status(query.table, &response)?;

        let rows: Vec<Value> = response.json().await?;
        debug!("Fetched {} rows from {}", rows.len(), query.table);
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let mut params: Vec<(String, String)> = query
            .to_params()
            .into_iter()
            .filter(|(key, _)| key != "order" && key != "limit")
            .collect();
        if let Some(select) = params.iter_mut().find(|(key, _)| key == "select") {
            select.1 = "id".to_string();
        }

        let response = self
            .client
            .head(self.table_url(query.table))
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        check_status(query.table, &response)?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| OperatorError::store(query.table, "missing row count in response"))
    }

    async fn subscribe(&self, table: Table, scope: &CancellationToken) -> Result<Subscription> {
        match &self.feed {
            Some(feed) => feed.subscribe(table, scope).await,
            None => {
                warn!("No change feed configured, live updates for {} are disabled", table);
                // Keep the sender alive for the subscription's lifetime so the
                // receiver stays pending instead of reporting a closed feed.
                let (tx, rx) = mpsc::channel(1);
                let token = scope.child_token();
                let held = token.clone();
                tokio::spawn(async move {
                    held.cancelled().await;
                    drop(tx);
                });
                Ok(Subscription::new(table, rx, token))
            }
        }
    }
}
