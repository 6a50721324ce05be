use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::{
    db::{
        helpers::{duration_from_ms, duration_to_ms, format_datetime, parse_datetime},
        models::{FitnessKind, FitnessRecord},
        Database,
    },
    session::FitnessRecordSink,
};

fn row_to_record(row: &Row) -> Result<FitnessRecord> {
    let kind: String = row.get("kind")?;
    let duration_ms: Option<i64> = row.get("duration_ms")?;
    let start_date: String = row.get("start_date")?;
    let end_date: String = row.get("end_date")?;

    Ok(FitnessRecord {
        id: row.get("id")?,
        kind: FitnessKind::parse(&kind)?,
        distance_m: row.get("distance_m")?,
        duration: duration_ms
            .map(|ms| duration_from_ms(ms, "duration_ms"))
            .transpose()?,
        start_date: parse_datetime(&start_date, "start_date")?,
        end_date: parse_datetime(&end_date, "end_date")?,
    })
}

impl Database {
    async fn insert_fitness_record(
        &self,
        kind: FitnessKind,
        distance_m: f64,
        duration: Option<Duration>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO fitness_records (kind, distance_m, duration_ms, start_date, end_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    kind.as_str(),
                    distance_m,
                    duration.map(duration_to_ms).transpose()?,
                    format_datetime(&start_date),
                    format_datetime(&end_date),
                    format_datetime(&Utc::now()),
                ],
            )
            .with_context(|| format!("failed to insert {} record", kind.as_str()))?;
            Ok(())
        })
        .await
    }

    pub async fn list_fitness_records(&self) -> Result<Vec<FitnessRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, distance_m, duration_ms, start_date, end_date
                 FROM fitness_records
                 ORDER BY end_date DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}

#[async_trait]
impl FitnessRecordSink for Database {
    async fn save_workout(
        &self,
        distance_m: f64,
        duration: Duration,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<()> {
        self.insert_fitness_record(
            FitnessKind::Workout,
            distance_m,
            Some(duration),
            start_date,
            end_date,
        )
        .await
    }

    async fn save_distance(&self, distance_m: f64, date: DateTime<Utc>) -> Result<()> {
        self.insert_fitness_record(FitnessKind::Distance, distance_m, None, date, date)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[tokio::test]
    async fn records_workouts_and_distances() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ridelog.sqlite3")).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let end = start + chrono::Duration::seconds(1800);

        db.save_workout(12_500.0, Duration::from_secs(1800), start, end)
            .await
            .unwrap();
        db.save_distance(12_500.0, end).await.unwrap();

        let records = db.list_fitness_records().await.unwrap();
        assert_eq!(records.len(), 2);

        let distance = &records[0];
        assert_eq!(distance.kind, FitnessKind::Distance);
        assert_eq!(distance.duration, None);
        assert_eq!(distance.start_date, end);

        let workout = &records[1];
        assert_eq!(workout.kind, FitnessKind::Workout);
        assert_eq!(workout.distance_m, 12_500.0);
        assert_eq!(workout.duration, Some(Duration::from_secs(1800)));
        assert_eq!(workout.start_date, start);
        assert_eq!(workout.end_date, end);
    }
}
