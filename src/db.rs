use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Placeholder id used by the baseline seed rows in each pooled table.
pub const PLACEHOLDER_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Open (creating if necessary) the target database and ensure the schema
/// and baseline seed rows exist. Safe to call on every invocation.
pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    create_schema(&conn)?;
    seed_defaults(&conn)?;

    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS coaches(
            coach_id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            rate REAL
        );

        CREATE TABLE IF NOT EXISTS locations(
            rink_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            ice_cost REAL,
            date_created TEXT
        );

        CREATE TABLE IF NOT EXISTS clubs(
            club_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            home_rink TEXT,
            annual_cost REAL,
            FOREIGN KEY(home_rink) REFERENCES locations(rink_id)
        );

        CREATE TABLE IF NOT EXISTS users(
            skater_id TEXT PRIMARY KEY,
            login TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            phone TEXT,
            password_hash TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles(
            skater_id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            middle_name TEXT,
            last_name TEXT NOT NULL,
            city TEXT,
            state TEXT,
            country TEXT,
            zip TEXT,
            tz TEXT NOT NULL DEFAULT 'UTC',
            roles TEXT NOT NULL DEFAULT '[]',
            combo_ice TEXT,
            combo_off TEXT,
            rink_pref TEXT,
            maint_interval INTEGER,
            active_coach TEXT,
            club_id TEXT,
            club_join_date TEXT,
            usfsa_number INTEGER,
            date_created TEXT,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id),
            FOREIGN KEY(rink_pref) REFERENCES locations(rink_id),
            FOREIGN KEY(active_coach) REFERENCES coaches(coach_id),
            FOREIGN KEY(club_id) REFERENCES clubs(club_id)
        );

        CREATE TABLE IF NOT EXISTS boots(
            boot_id TEXT PRIMARY KEY,
            skater_id TEXT NOT NULL,
            model TEXT NOT NULL,
            size TEXT,
            purchase_date TEXT,
            cost REAL,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id)
        );

        CREATE TABLE IF NOT EXISTS blades(
            blade_id TEXT PRIMARY KEY,
            skater_id TEXT NOT NULL,
            model TEXT NOT NULL,
            size TEXT,
            purchase_date TEXT,
            cost REAL,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id)
        );

        CREATE TABLE IF NOT EXISTS skate_configs(
            config_id TEXT PRIMARY KEY,
            skater_id TEXT NOT NULL,
            boot_id TEXT NOT NULL,
            blade_id TEXT NOT NULL,
            label TEXT,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id),
            FOREIGN KEY(boot_id) REFERENCES boots(boot_id),
            FOREIGN KEY(blade_id) REFERENCES blades(blade_id)
        );

        CREATE TABLE IF NOT EXISTS club_members(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skater_id TEXT NOT NULL,
            club_id TEXT NOT NULL,
            joined_date TEXT,
            expiration_date TEXT,
            fee REAL,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id),
            FOREIGN KEY(club_id) REFERENCES clubs(club_id)
        );

        CREATE TABLE IF NOT EXISTS punch_cards(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skater_id TEXT NOT NULL,
            rink_id TEXT NOT NULL,
            punches INTEGER,
            cost REAL,
            purchase_date TEXT,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id),
            FOREIGN KEY(rink_id) REFERENCES locations(rink_id)
        );

        CREATE TABLE IF NOT EXISTS lts_classes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skater_id TEXT NOT NULL,
            location_id TEXT NOT NULL,
            class_name TEXT NOT NULL,
            cost REAL,
            start_date TEXT,
            end_date TEXT,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id),
            FOREIGN KEY(location_id) REFERENCES locations(rink_id)
        );

        CREATE TABLE IF NOT EXISTS maintenance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skater_id TEXT NOT NULL,
            blade_id TEXT,
            config_id TEXT,
            date TEXT NOT NULL,
            location TEXT,
            kind TEXT,
            cost REAL,
            notes TEXT,
            FOREIGN KEY(skater_id) REFERENCES users(skater_id)
        );

        CREATE TABLE IF NOT EXISTS ice_time(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            skater_id TEXT NOT NULL,
            date TEXT NOT NULL,
            minutes INTEGER,
            rink_id TEXT,
            coach_id TEXT,
            skate_type TEXT,
            config_id TEXT,
            cost REAL
        );

        CREATE INDEX IF NOT EXISTS idx_ice_time_skater ON ice_time(skater_id);
        CREATE INDEX IF NOT EXISTS idx_maintenance_skater ON maintenance(skater_id);
        CREATE INDEX IF NOT EXISTS idx_boots_skater ON boots(skater_id);
        CREATE INDEX IF NOT EXISTS idx_blades_skater ON blades(skater_id);
        CREATE INDEX IF NOT EXISTS idx_configs_skater ON skate_configs(skater_id);",
    )
    .context("Failed to create schema")?;

    Ok(())
}

/// Baseline rows every fresh database carries: one placeholder entry per
/// pooled table so optional references have a valid target before any
/// real pooled data is restored.
fn seed_defaults(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO coaches(coach_id, first_name, last_name) VALUES(?1, 'No', 'Coach')",
        [PLACEHOLDER_ID],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO locations(rink_id, name) VALUES(?1, 'No Rink')",
        [PLACEHOLDER_ID],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO clubs(club_id, name) VALUES(?1, 'No Club')",
        [PLACEHOLDER_ID],
    )?;
    Ok(())
}

/// True once a profile row exists for the skater. Used as the precondition
/// for the equipment/memberships/maintenance steps.
pub fn profile_exists(conn: &Connection, skater_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE skater_id = ?1",
        [skater_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema_and_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir.path().join("test.sqlite3")).unwrap();

        let coaches: i64 = conn
            .query_row("SELECT COUNT(*) FROM coaches", [], |r| r.get(0))
            .unwrap();
        let clubs: i64 = conn
            .query_row("SELECT COUNT(*) FROM clubs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(coaches, 1);
        assert_eq!(clubs, 1);
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");
        drop(open(&path).unwrap());
        let conn = open(&path).unwrap();

        let locations: i64 = conn
            .query_row("SELECT COUNT(*) FROM locations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(locations, 1);
    }

    #[test]
    fn test_profile_exists() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir.path().join("test.sqlite3")).unwrap();

        assert!(!profile_exists(&conn, "abc").unwrap());
        conn.execute(
            "INSERT INTO users(skater_id, login, email, password_hash)
             VALUES('abc', 'sparkles', 's@example.com', 'x')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO profiles(skater_id, first_name, last_name)
             VALUES('abc', 'Sparkle', 'Skater')",
            [],
        )
        .unwrap();
        assert!(profile_exists(&conn, "abc").unwrap());
    }
}
