//! Index of pooled (shared) reference entities: coaches, locations, clubs.
//!
//! The index merges the pooled fixture documents with rows already in the
//! database, so a second user's restore validates cleanly even when the
//! `pooled` step is skipped. Read-only; never mutates state.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashSet;
use std::fmt;

use crate::fixtures::PooledFixtures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Coach,
    Location,
    Club,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Coach => write!(f, "coach"),
            RefKind::Location => write!(f, "location"),
            RefKind::Club => write!(f, "club"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    coaches: HashSet<String>,
    locations: HashSet<String>,
    clubs: HashSet<String>,
}

impl ReferenceIndex {
    /// Build the index from pooled fixtures plus existing database rows.
    pub fn load(conn: &Connection, pooled: &PooledFixtures) -> Result<Self> {
        let mut index = Self::default();

        for coach in &pooled.coaches {
            index.coaches.insert(coach.coach_id.clone());
        }
        for location in &pooled.locations {
            index.locations.insert(location.rink_id.clone());
        }
        for club in &pooled.clubs {
            index.clubs.insert(club.club_id.clone());
        }

        collect_ids(conn, "SELECT coach_id FROM coaches", &mut index.coaches)?;
        collect_ids(conn, "SELECT rink_id FROM locations", &mut index.locations)?;
        collect_ids(conn, "SELECT club_id FROM clubs", &mut index.clubs)?;

        Ok(index)
    }

    /// Build the index from fixture documents alone (used by `validate`,
    /// which may run without a reachable database).
    pub fn from_fixtures(pooled: &PooledFixtures) -> Self {
        let mut index = Self::default();
        index
            .coaches
            .extend(pooled.coaches.iter().map(|c| c.coach_id.clone()));
        index
            .locations
            .extend(pooled.locations.iter().map(|l| l.rink_id.clone()));
        index
            .clubs
            .extend(pooled.clubs.iter().map(|c| c.club_id.clone()));
        index
    }

    pub fn exists(&self, kind: RefKind, id: &str) -> bool {
        match kind {
            RefKind::Coach => self.coaches.contains(id),
            RefKind::Location => self.locations.contains(id),
            RefKind::Club => self.clubs.contains(id),
        }
    }
}

fn collect_ids(conn: &Connection, sql: &str, into: &mut HashSet<String>) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for id in rows {
        into.insert(id?);
    }
    Ok(())
}

/// True once every pooled table holds more than its single baseline seed
/// row. Gates the `pooled` restore step so a second user's restore does not
/// duplicate shared rows.
pub fn is_populated_beyond_defaults(conn: &Connection) -> Result<bool> {
    let count = |table: &str| -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    };

    Ok(count("coaches")? > 1 && count("locations")? > 1 && count("clubs")? > 1)
}
