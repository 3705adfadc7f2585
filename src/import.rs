//! Bulk CSV import into `ice_time` and `maintenance`.
//!
//! Legacy exports commonly contain every user's rows in one file, so rows
//! for other users are filtered and counted rather than errored. Rows with
//! placeholder or unparseable dates are skipped and counted. A raw row id
//! column from the source database is dropped; the target schema generates
//! its own.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionRow {
    /// Raw row id from the source export; stripped before insertion.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub skater_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub minutes: Option<i64>,
    #[serde(default)]
    pub rink_id: Option<String>,
    #[serde(default)]
    pub coach_id: Option<String>,
    #[serde(default)]
    pub skate_type: Option<String>,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceRow {
    #[serde(default)]
    pub id: Option<i64>,
    /// Injected from the resolved user identity when the column is absent.
    #[serde(default)]
    pub skater_id: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub blade_id: Option<String>,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped_other_user: usize,
    pub skipped_bad_date: usize,
    pub skipped_unmapped_id: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} skipped (other user), {} skipped (bad date), {} skipped (unmapped id)",
            self.inserted, self.skipped_other_user, self.skipped_bad_date, self.skipped_unmapped_id
        )
    }
}

pub fn read_session_csv(path: &Path) -> Result<Vec<SessionRow>> {
    read_csv(path)
}

pub fn read_maintenance_csv(path: &Path) -> Result<Vec<MaintenanceRow>> {
    read_csv(path)
}

fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV {:?}", path))?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let row: T =
            record.with_context(|| format!("Failed to parse CSV row {} in {:?}", i + 2, path))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse and canonicalize a legacy date string. Returns `None` for empty
/// strings, all-zero placeholders, and anything no accepted format parses.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }

    // All-zero placeholders (0000-00-00 and friends) fall through here:
    // month zero fails to parse like any other bad date.
    None
}

/// Append session rows for `target_user` into `ice_time`. One transaction
/// for the whole batch.
pub fn import_sessions(
    conn: &mut Connection,
    rows: &[SessionRow],
    target_user: &str,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO ice_time(skater_id, date, minutes, rink_id, coach_id, skate_type, config_id, cost)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for row in rows {
            if row.skater_id != target_user {
                summary.skipped_other_user += 1;
                continue;
            }
            let date = match normalize_date(&row.date) {
                Some(date) => date,
                None => {
                    summary.skipped_bad_date += 1;
                    println!("  SKIPPED row with invalid date {:?}", row.date);
                    continue;
                }
            };

            stmt.execute(rusqlite::params![
                row.skater_id,
                date,
                row.minutes,
                row.rink_id,
                row.coach_id,
                row.skate_type,
                row.config_id,
                row.cost,
            ])?;
            summary.inserted += 1;
        }
    }

    tx.commit()?;
    Ok(summary)
}

/// Append maintenance rows for `target_user` into `maintenance`. Rows with
/// no user column get the resolved id injected rather than erroring.
pub fn import_maintenance(
    conn: &mut Connection,
    rows: &[MaintenanceRow],
    target_user: &str,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO maintenance(skater_id, blade_id, config_id, date, location, kind, cost, notes)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for row in rows {
            let skater_id = row.skater_id.as_deref().unwrap_or(target_user);
            if skater_id != target_user {
                summary.skipped_other_user += 1;
                continue;
            }
            let date = match normalize_date(&row.date) {
                Some(date) => date,
                None => {
                    summary.skipped_bad_date += 1;
                    println!("  SKIPPED row with invalid date {:?}", row.date);
                    continue;
                }
            };

            stmt.execute(rusqlite::params![
                skater_id,
                row.blade_id,
                row.config_id,
                date,
                row.location,
                row.kind,
                row.cost,
                row.notes,
            ])?;
            summary.inserted += 1;
        }
    }

    tx.commit()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::open(&dir.path().join("test.sqlite3")).unwrap();
        (dir, conn)
    }

    fn session(user: &str, date: &str) -> SessionRow {
        SessionRow {
            skater_id: user.to_string(),
            date: date.to_string(),
            minutes: Some(60),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_date_accepts_common_formats() {
        assert_eq!(normalize_date("2026-01-05").as_deref(), Some("2026-01-05"));
        assert_eq!(normalize_date("2026/01/05").as_deref(), Some("2026-01-05"));
        assert_eq!(normalize_date("01/05/2026").as_deref(), Some("2026-01-05"));
        assert_eq!(
            normalize_date("2026-01-05 07:30:00").as_deref(),
            Some("2026-01-05 07:30:00")
        );
    }

    #[test]
    fn test_normalize_date_rejects_placeholders_and_garbage() {
        assert_eq!(normalize_date("0000-00-00"), None);
        assert_eq!(normalize_date("0000/00/00 00:00:00"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("soon"), None);
        assert_eq!(normalize_date("2026-13-40"), None);
    }

    #[test]
    fn test_import_sessions_filters_other_users() {
        let (_dir, mut conn) = test_conn();
        let rows = vec![
            session("u-a", "2026-01-05"),
            session("u-b", "2026-01-06"),
            session("u-a", "2026-01-07"),
            session("u-b", "2026-01-08"),
            session("u-b", "2026-01-09"),
        ];

        let summary = import_sessions(&mut conn, &rows, "u-a").unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped_other_user, 3);
        assert_eq!(summary.inserted + summary.skipped_other_user, rows.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ice_time WHERE skater_id = 'u-a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
        let others: i64 = conn
            .query_row("SELECT COUNT(*) FROM ice_time WHERE skater_id <> 'u-a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(others, 0);
    }

    #[test]
    fn test_import_sessions_skips_bad_dates() {
        let (_dir, mut conn) = test_conn();
        let rows = vec![
            session("u-a", "2026-01-05"),
            session("u-a", "0000-00-00"),
            session("u-a", "not a date"),
        ];

        let summary = import_sessions(&mut conn, &rows, "u-a").unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_bad_date, 2);
    }

    #[test]
    fn test_import_sessions_strips_raw_row_id() {
        let (_dir, mut conn) = test_conn();
        let mut row = session("u-a", "2026-01-05");
        row.id = Some(9999);

        import_sessions(&mut conn, &[row], "u-a").unwrap();
        let id: i64 = conn
            .query_row("SELECT id FROM ice_time", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_import_maintenance_injects_user_id() {
        let (_dir, mut conn) = test_conn();
        conn.execute(
            "INSERT INTO users(skater_id, login, email, password_hash)
             VALUES('u-a', 'a', 'a@example.com', 'x')",
            [],
        )
        .unwrap();
        let rows = vec![MaintenanceRow {
            date: "2026-02-01".to_string(),
            kind: Some("sharpening".to_string()),
            cost: Some(25.0),
            ..Default::default()
        }];

        let summary = import_maintenance(&mut conn, &rows, "u-a").unwrap();
        assert_eq!(summary.inserted, 1);

        let skater: String = conn
            .query_row("SELECT skater_id FROM maintenance", [], |r| r.get(0))
            .unwrap();
        assert_eq!(skater, "u-a");
    }

    #[test]
    fn test_read_session_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.csv");
        std::fs::write(
            &path,
            "id,skater_id,date,minutes,rink_id,skate_type\n\
             7,u-a,2026-01-05,60,r-1,freestyle\n\
             8,u-b,2026-01-06,45,r-1,public\n",
        )
        .unwrap();

        let rows = read_session_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(7));
        assert_eq!(rows[0].skater_id, "u-a");
        assert_eq!(rows[1].minutes, Some(45));
        assert!(rows[0].coach_id.is_none());
    }
}
