pub mod mappings;
pub mod translate;

pub use mappings::*;
pub use translate::*;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::import::{self, ImportSummary};

/// One-time legacy migration: read a legacy CSV export (integer ids),
/// translate every id through the mapping tables, and append the surviving
/// rows to `ice_time`.
///
/// An unmapped coach/location/config id only skips that row. An unmapped
/// skater or session-type id is a systemic mapping-file problem: all such
/// ids are reported at once and the migration aborts without writing.
pub fn run(
    conn: &mut Connection,
    csv_path: &Path,
    shared: &SharedMappings,
    user: &UserMappings,
    target_user: &str,
) -> Result<ImportSummary> {
    let legacy_rows = read_legacy_csv(csv_path)?;
    println!("  Read {} rows from {:?}", legacy_rows.len(), csv_path);

    let mut translated = Vec::new();
    let mut skipped_unmapped = 0usize;
    let mut skipped_other_user = 0usize;
    let mut critical: Vec<String> = Vec::new();

    for (i, row) in legacy_rows.iter().enumerate() {
        match translate(row, shared, user) {
            Ok(session) => translated.push(session),
            Err(unmapped) => {
                if unmapped.iter().any(|u| u.critical) {
                    for u in unmapped.iter().filter(|u| u.critical) {
                        critical.push(format!("row {}: {}", i + 2, u));
                    }
                } else {
                    // The skater id did translate (it is critical when it
                    // does not), so the row can still be attributed. Rows
                    // belonging to other users count as theirs, not as
                    // unmapped-id skips.
                    let skater = row.skater_id.and_then(|legacy| user.skaters.get(&legacy));
                    if skater.map(|id| id == target_user).unwrap_or(false) {
                        skipped_unmapped += 1;
                        for u in &unmapped {
                            println!("  SKIPPED row {}: {}", i + 2, u);
                        }
                    } else {
                        skipped_other_user += 1;
                    }
                }
            }
        }
    }

    if !critical.is_empty() {
        println!("\n  ABORT -- {} unmapped critical id(s):", critical.len());
        for line in &critical {
            println!("    - {}", line);
        }
        bail!("migration aborted: {} unmapped critical id(s)", critical.len());
    }

    let mut summary = import::import_sessions(conn, &translated, target_user)?;
    summary.skipped_unmapped_id = skipped_unmapped;
    summary.skipped_other_user += skipped_other_user;
    Ok(summary)
}

pub fn read_legacy_csv(path: &Path) -> Result<Vec<LegacySessionRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open legacy CSV {:?}", path))?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let row: LegacySessionRow = record
            .with_context(|| format!("Failed to parse legacy CSV row {} in {:?}", i + 2, path))?;
        rows.push(row);
    }
    Ok(rows)
}
