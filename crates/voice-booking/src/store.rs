//! Booking Store: the sole durable owner of Appointment rows (spec §3, §4.3).
//!
//! Backed by SQLite with WAL journaling. The uniqueness guarantee on
//! `(appointment_date, appointment_time)` among confirmed rows rests on a
//! unique index, checked at commit time inside a serialized transaction;
//! the in-code pre-check is an optimization only (spec §9 Design Notes).

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

use voice_domain::error::{Error, Result};

use crate::slots::slots_for_date;

#[derive(Debug, Clone, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub customer_name: String,
    pub phone_number: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub confirmation_number: String,
    pub created_at: chrono::DateTime<Utc>,
    pub call_sid: Option<String>,
    pub status: String,
}

pub struct CreateAppointmentRequest {
    pub customer_name: String,
    pub phone_number: String,
    pub date: NaiveDate,
    pub time_label: String,
    pub call_sid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateAppointmentOutcome {
    Success { confirmation_number: String },
    SlotTaken,
}

/// Owns the appointments table exclusively. Cloning shares the underlying
/// connection pool (spec §5, shared resource (a)).
#[derive(Clone)]
pub struct BookingStore {
    pool: SqlitePool,
}

impl BookingStore {
    /// Open (creating if absent) the SQLite database at `database_path` with
    /// WAL journaling, and ensure the schema exists.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{database_path}"))
            .map_err(|e| Error::Database(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests — each call gets its own isolated database.
    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                appointment_date TEXT NOT NULL,
                appointment_time TEXT NOT NULL,
                confirmation_number TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                call_sid TEXT,
                status TEXT NOT NULL DEFAULT 'confirmed'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_appointments_date_time \
             ON appointments (appointment_date, appointment_time)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_confirmed_slot \
             ON appointments (appointment_date, appointment_time) \
             WHERE status = 'confirmed'",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// `list_available_slots` tool: the day's full slot set minus labels
    /// already confirmed on that date. Empty on weekends (spec §4.3).
    pub async fn available_slots(&self, date: NaiveDate) -> Result<Vec<String>> {
        let all_slots = slots_for_date(date);
        if all_slots.is_empty() {
            return Ok(all_slots);
        }

        let date_str = date.format("%Y-%m-%d").to_string();
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT appointment_time FROM appointments \
             WHERE appointment_date = ?1 AND status = 'confirmed'",
        )
        .bind(&date_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(all_slots
            .into_iter()
            .filter(|label| !taken.contains(label))
            .collect())
    }

    /// `create_appointment` tool: race-free within one serialized transaction.
    /// The unique index is the authority; the pre-check below only avoids an
    /// unnecessary insert attempt on the common path (spec §4.3, §9).
    pub async fn create_appointment(
        &self,
        req: CreateAppointmentRequest,
    ) -> Result<CreateAppointmentOutcome> {
        let date_str = req.date.format("%Y-%m-%d").to_string();
        let mut tx = self.pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM appointments \
             WHERE appointment_date = ?1 AND appointment_time = ?2 AND status = 'confirmed' \
             LIMIT 1",
        )
        .bind(&date_str)
        .bind(&req.time_label)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        if existing.is_some() {
            tx.rollback().await.ok();
            return Ok(CreateAppointmentOutcome::SlotTaken);
        }

        let confirmation_number = generate_confirmation_number();
        let now = Utc::now().to_rfc3339();

        let insert = sqlx::query(
            "INSERT INTO appointments \
             (customer_name, phone_number, appointment_date, appointment_time, \
              confirmation_number, created_at, call_sid, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'confirmed')",
        )
        .bind(&req.customer_name)
        .bind(&req.phone_number)
        .bind(&date_str)
        .bind(&req.time_label)
        .bind(&confirmation_number)
        .bind(&now)
        .bind(&req.call_sid)
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {
                tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
                Ok(CreateAppointmentOutcome::Success { confirmation_number })
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Two callers raced past the pre-check; the index caught it.
                tx.rollback().await.ok();
                Ok(CreateAppointmentOutcome::SlotTaken)
            }
            Err(e) => {
                tx.rollback().await.ok();
                Err(Error::Database(e.to_string()))
            }
        }
    }
}

fn generate_confirmation_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("APT-{n:05}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn weekend_query_returns_empty() {
        let store = BookingStore::connect_in_memory().await.unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        assert!(store.available_slots(saturday).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekday_all_slots_minus_booked() {
        let store = BookingStore::connect_in_memory().await.unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let before = store.available_slots(tuesday).await.unwrap();
        assert_eq!(before.len(), 14);

        let outcome = store
            .create_appointment(CreateAppointmentRequest {
                customer_name: "Alice".into(),
                phone_number: "+15550100".into(),
                date: tuesday,
                time_label: "10:30 AM".into(),
                call_sid: "C1".into(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CreateAppointmentOutcome::Success { .. }));

        let after = store.available_slots(tuesday).await.unwrap();
        assert_eq!(after.len(), 13);
        assert!(!after.contains(&"10:30 AM".to_string()));
    }

    #[tokio::test]
    async fn second_booking_of_same_slot_is_rejected() {
        let store = BookingStore::connect_in_memory().await.unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let req = || CreateAppointmentRequest {
            customer_name: "Alice".into(),
            phone_number: "+15550100".into(),
            date: tuesday,
            time_label: "10:30 AM".into(),
            call_sid: "C1".into(),
        };

        let first = store.create_appointment(req()).await.unwrap();
        assert!(matches!(first, CreateAppointmentOutcome::Success { .. }));

        let second = store.create_appointment(req()).await.unwrap();
        assert_eq!(second, CreateAppointmentOutcome::SlotTaken);
    }

    #[tokio::test]
    async fn concurrent_double_booking_yields_one_success_one_slot_taken() {
        let store = BookingStore::connect_in_memory().await.unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let req = |call_sid: &str| CreateAppointmentRequest {
            customer_name: "Alice".into(),
            phone_number: "+15550100".into(),
            date: tuesday,
            time_label: "11:00 AM".into(),
            call_sid: call_sid.into(),
        };

        let store_a = store.clone();
        let store_b = store.clone();
        let (a, b) = tokio::join!(
            store_a.create_appointment(req("C1")),
            store_b.create_appointment(req("C2")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let successes = [&a, &b]
            .iter()
            .filter(|o| matches!(o, CreateAppointmentOutcome::Success { .. }))
            .count();
        let slot_taken = [&a, &b]
            .iter()
            .filter(|o| matches!(o, CreateAppointmentOutcome::SlotTaken))
            .count();
        assert_eq!(successes, 1, "exactly one of the two racing bookings should win");
        assert_eq!(slot_taken, 1, "the other should observe the slot as taken");
    }

    #[tokio::test]
    async fn fully_booked_weekday_returns_empty() {
        let store = BookingStore::connect_in_memory().await.unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        for label in slots_for_date(tuesday) {
            let outcome = store
                .create_appointment(CreateAppointmentRequest {
                    customer_name: "Bob".into(),
                    phone_number: "+15550101".into(),
                    date: tuesday,
                    time_label: label,
                    call_sid: "C2".into(),
                })
                .await
                .unwrap();
            assert!(matches!(outcome, CreateAppointmentOutcome::Success { .. }));
        }
        assert!(store.available_slots(tuesday).await.unwrap().is_empty());
    }
}
