//! Row types shared by the SQL backends.
//!
//! Timestamps are stored as Unix milliseconds.

use crate::models::{ClickEvent, LinkRecord};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;

use super::StorageError;

#[derive(Debug, FromRow)]
pub(crate) struct LinkRow {
    pub short_code: String,
    pub original_url: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, FromRow)]
pub(crate) struct ClickRow {
    pub short_code: String,
    pub clicked_at: i64,
    pub source: String,
    pub location: String,
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::Unavailable(anyhow!("timestamp out of range: {millis}")))
}

impl TryFrom<ClickRow> for ClickEvent {
    type Error = StorageError;

    fn try_from(row: ClickRow) -> Result<Self, Self::Error> {
        Ok(ClickEvent {
            timestamp: from_millis(row.clicked_at)?,
            source: row.source,
            location: row.location,
        })
    }
}

impl LinkRow {
    pub fn into_record(self, clicks: Vec<ClickEvent>) -> Result<LinkRecord, StorageError> {
        Ok(LinkRecord {
            code: self.short_code,
            original_url: self.original_url,
            created_at: from_millis(self.created_at)?,
            expires_at: from_millis(self.expires_at)?,
            clicks,
        })
    }
}

/// Stitch link rows and click rows (ordered by insertion) into records.
pub(crate) fn assemble(
    links: Vec<LinkRow>,
    clicks: Vec<ClickRow>,
) -> Result<Vec<LinkRecord>, StorageError> {
    let mut by_code: HashMap<String, Vec<ClickEvent>> = HashMap::new();
    for row in clicks {
        let code = row.short_code.clone();
        by_code.entry(code).or_default().push(row.try_into()?);
    }

    links
        .into_iter()
        .map(|link| {
            let clicks = by_code.remove(&link.short_code).unwrap_or_default();
            link.into_record(clicks)
        })
        .collect()
}
