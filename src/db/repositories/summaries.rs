use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        helpers::{
            duration_from_ms, duration_to_ms, format_datetime, parse_datetime,
            parse_optional_datetime, to_i64, to_u64,
        },
        Database,
    },
    models::{Gcj02Position, Segment, SessionInfo, SessionSummary},
    session::SummarySink,
};

const SUMMARY_COLUMNS: &str = "id, date, started_at, total_distance, total_duration_ms, average_speed, average_heart_rate, total_calories, segments_json, route_json";

fn row_to_summary(row: &Row) -> Result<SessionSummary> {
    let id: String = row.get("id")?;
    let date: String = row.get("date")?;
    let started_at: Option<String> = row.get("started_at")?;
    let total_duration_ms: i64 = row.get("total_duration_ms")?;
    let average_heart_rate: i64 = row.get("average_heart_rate")?;
    let segments_json: String = row.get("segments_json")?;
    let route_json: String = row.get("route_json")?;

    let segments: Vec<Segment> =
        serde_json::from_str(&segments_json).context("failed to decode segments_json")?;
    let route_coordinates: Vec<Gcj02Position> =
        serde_json::from_str(&route_json).context("failed to decode route_json")?;

    Ok(SessionSummary {
        id: Uuid::parse_str(&id).with_context(|| format!("invalid summary id {id}"))?,
        date: parse_datetime(&date, "date")?,
        started_at: parse_optional_datetime(started_at, "started_at")?,
        total_distance: row.get("total_distance")?,
        total_duration: duration_from_ms(total_duration_ms, "total_duration_ms")?,
        average_speed: row.get("average_speed")?,
        average_heart_rate: u32::try_from(to_u64(average_heart_rate, "average_heart_rate")?)
            .with_context(|| format!("invalid average_heart_rate {average_heart_rate}"))?,
        total_calories: row.get("total_calories")?,
        segments,
        route_coordinates,
    })
}

impl Database {
    /// Stores a finished session. A stored summary with the same `date`
    /// (or id) is replaced.
    pub async fn save_summary(&self, summary: &SessionSummary) -> Result<()> {
        let record = summary.clone();
        self.execute(move |conn| {
            let segments_json = serde_json::to_string(&record.segments)
                .context("failed to encode segments")?;
            let route_json = serde_json::to_string(&record.route_coordinates)
                .context("failed to encode route")?;

            conn.execute(
                "INSERT OR REPLACE INTO session_summaries
                 (id, date, started_at, total_distance, total_duration_ms, average_speed,
                  average_heart_rate, total_calories, segments_json, route_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.to_string(),
                    format_datetime(&record.date),
                    record.started_at.as_ref().map(format_datetime),
                    record.total_distance,
                    duration_to_ms(record.total_duration)?,
                    record.average_speed,
                    to_i64(u64::from(record.average_heart_rate))?,
                    record.total_calories,
                    segments_json,
                    route_json,
                    format_datetime(&Utc::now()),
                ],
            )
            .context("failed to save session summary")?;
            Ok(())
        })
        .await?;

        info!("saved session summary {} ({})", summary.id, summary.date);
        Ok(())
    }

    /// Newest first.
    pub async fn list_summaries(&self) -> Result<Vec<SessionInfo>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM session_summaries ORDER BY date DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                let summary = row_to_summary(row)?;
                sessions.push(SessionInfo::from(&summary));
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn get_summary(&self, id: Uuid) -> Result<Option<SessionSummary>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE id = ?1"
            ))?;
            let summary = stmt
                .query_row(params![id.to_string()], |row| Ok(row_to_summary(row)))
                .optional()?
                .transpose()?;
            Ok(summary)
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_summary(&self, id: Uuid) -> Result<bool> {
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM session_summaries WHERE id = ?1",
                params![id.to_string()],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl SummarySink for Database {
    async fn save_summary(&self, summary: &SessionSummary) -> Result<()> {
        Database::save_summary(self, summary).await
    }
}
