use sqlx::postgres::{PgListener, PgPoolOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use yaraguard_common::{ChangeEvent, Table};

use crate::config::RealtimeConfig;
use crate::error::{OperatorError, Result};
use super::Subscription;

const EVENT_BUFFER: usize = 64;

/// Change notifications over Postgres `LISTEN/NOTIFY`.
///
/// Payloads are JSON `{"table": "...", "type": "INSERT|UPDATE|DELETE"}` as
/// emitted by the triggers in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgChangeFeed {
    database_url: String,
    channel: String,
}

impl PgChangeFeed {
    pub fn new(database_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            channel: channel.into(),
        }
    }

    pub fn from_config(config: &RealtimeConfig) -> Option<Self> {
        config
            .database_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.channel.clone()))
    }

    /// Installs the notify triggers.
    pub async fn install_triggers(&self) -> Result<()> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        pool.close().await;

        info!("Change notification triggers installed");
        Ok(())
    }

    pub async fn subscribe(&self, table: Table, scope: &CancellationToken) -> Result<Subscription> {
        let mut listener = PgListener::connect(&self.database_url).await?;
        listener
            .listen(&self.channel)
            .await
            .map_err(|e| OperatorError::Subscription {
                table,
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = scope.child_token();
        let stop = token.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    notification = listener.recv() => match notification {
                        Ok(notification) => {
                            match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                                Ok(event) if event.table == table => {
                                    if tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(_) => {}
                                Err(e) => warn!("Ignoring malformed payload on {}: {}", channel, e),
                            }
                        }
                        Err(e) => {
                            error!("Change listener for {} failed: {}", table, e);
                            break;
                        }
                    },
                }
            }
            debug!("Change listener for {} stopped", table);
        });

        info!("Listening for {} changes on channel {}", table, self.channel);
        Ok(Subscription::new(table, rx, token))
    }
}
