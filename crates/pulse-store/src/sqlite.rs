//! SQLite feedback reader.
//!
//! `created_at` is stored as naive UTC+8 text (`YYYY-MM-DD HH:MM:SS[.ffffff]`),
//! so cutoffs are formatted the same way and compared as strings.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use pulse_core::clock;
use pulse_core::error::{PulseError, Result};
use pulse_core::traits::{FeedbackSession, FeedbackStore};
use pulse_core::types::FeedbackRecord;
use rusqlite::Connection;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_FORMAT_MICROS: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Opens one connection per pipeline run.
pub struct SqliteFeedbackStore {
    path: PathBuf,
}

impl SqliteFeedbackStore {
    /// Open the database at `path`, creating the feedback table if missing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(storage)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS userfeedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_uid TEXT NOT NULL,
                device_id INTEGER NOT NULL,
                app_version TEXT NOT NULL,
                app_channel TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                feedback_type TEXT NOT NULL,
                feedback TEXT NOT NULL,
                image_url TEXT,
                debug TEXT,
                created_at DATETIME
            );
            CREATE INDEX IF NOT EXISTS ix_userfeedback_created_at ON userfeedback (created_at);",
        )
        .map_err(storage)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedbackStore for SqliteFeedbackStore {
    fn open_session(&self) -> Result<Box<dyn FeedbackSession>> {
        let conn = Connection::open(&self.path).map_err(storage)?;
        tracing::debug!("🗄️ Feedback session opened on {}", self.path.display());
        Ok(Box::new(SqliteSession { conn }))
    }
}

/// A single connection, closed on drop.
pub struct SqliteSession {
    conn: Connection,
}

impl FeedbackSession for SqliteSession {
    fn fetch_since(&self, cutoff: NaiveDateTime) -> Result<Vec<FeedbackRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_uid, device_id, app_version, app_channel, user_agent,
                        feedback_type, feedback, image_url, debug, created_at
                 FROM userfeedback
                 WHERE created_at IS NOT NULL AND created_at >= ?1
                 ORDER BY created_at",
            )
            .map_err(storage)?;

        // A whole-second cutoff must not carry ".000000", or rows stored
        // without a fraction at exactly that second would sort below it.
        let format = if cutoff.nanosecond() == 0 {
            TIMESTAMP_FORMAT
        } else {
            TIMESTAMP_FORMAT_MICROS
        };
        let rows = stmt
            .query_map([cutoff.format(format).to_string()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })
            .map_err(storage)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, user_uid, device_id, app_version, app_channel, user_agent, feedback_type, feedback, image_url, debug, created_at) =
                row.map_err(storage)?;
            let Some(created_at) = parse_timestamp(&created_at) else {
                tracing::warn!("⚠️ Skipping feedback #{id}: unreadable created_at '{created_at}'");
                continue;
            };
            // Text comparison lets `T`-separated rows from the cutoff's day through.
            if created_at < cutoff {
                continue;
            }
            records.push(FeedbackRecord {
                id,
                user_uid,
                device_id,
                app_version,
                app_channel,
                user_agent,
                feedback_type,
                feedback,
                image_url,
                debug,
                created_at: clock::from_local_naive(created_at),
            });
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        tracing::debug!("🗄️ Feedback session released");
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

fn storage(e: rusqlite::Error) -> PulseError {
    PulseError::Storage(e.to_string())
}
