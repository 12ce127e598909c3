//! Keeps a free-tier backend from pausing by writing a row every few days

use chrono::{DateTime, Duration, Utc};
use cura4pif_postgrest::SortOrder;
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::gateway::{tables, Gateway};
use crate::models::parse_timestamp;

/// Age after which a new heartbeat row is written
pub const HEARTBEAT_INTERVAL_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// A row was written
    Recorded,
    /// The last row is recent enough
    Fresh,
    /// The table could not be read or written
    Skipped,
}

#[derive(Deserialize)]
struct KeepAliveRow {
    #[serde(default)]
    created_at: Option<String>,
}

/// Run the heartbeat as of `now`. Failures are logged and reported as `Skipped`.
pub async fn keep_alive_at(gateway: &Gateway, now: DateTime<Utc>) -> Heartbeat {
    match beat(gateway, now).await {
        Ok(true) => {
            tracing::info!("heartbeat recorded");
            Heartbeat::Recorded
        }
        Ok(false) => Heartbeat::Fresh,
        Err(e) => {
            tracing::debug!(error = %e, "heartbeat skipped");
            Heartbeat::Skipped
        }
    }
}

pub async fn keep_alive(gateway: &Gateway) -> Heartbeat {
    keep_alive_at(gateway, Utc::now()).await
}

async fn beat(gateway: &Gateway, now: DateTime<Utc>) -> Result<bool> {
    let last = gateway
        .from(tables::KEEP_ALIVE)?
        .select("created_at")
        .order("created_at", SortOrder::Descending)
        .execute_one::<KeepAliveRow>()
        .await?
        .and_then(|row| row.created_at)
        .and_then(|created_at| parse_timestamp(&created_at));

    let stale = match last {
        Some(last) => last < now - Duration::days(HEARTBEAT_INTERVAL_DAYS),
        None => true,
    };
    if !stale {
        return Ok(false);
    }

    gateway
        .from(tables::KEEP_ALIVE)?
        .insert(json!({}))
        .await?;
    Ok(true)
}
