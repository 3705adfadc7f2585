//! Pure legacy-id translation. No I/O beyond the supplied mapping tables:
//! the same row and the same tables always yield the same output.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use super::mappings::{SharedMappings, UserMappings};
use crate::import::SessionRow;

/// A row from the legacy database export, ids still integers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySessionRow {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub skater_id: Option<i64>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub minutes: Option<i64>,
    #[serde(default)]
    pub rink_id: Option<i64>,
    #[serde(default)]
    pub coach_id: Option<i64>,
    #[serde(default)]
    pub skate_type: Option<i64>,
    #[serde(default)]
    pub config_id: Option<i64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// One legacy-integer field that could not be translated. `critical` marks
/// the row's primary linking ids (skater, session type), whose absence from
/// the mapping tables aborts the whole migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedField {
    pub field: &'static str,
    pub legacy_id: Option<i64>,
    pub critical: bool,
}

impl fmt::Display for UnmappedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.legacy_id {
            Some(id) => write!(f, "{}: no mapping for legacy id {}", self.field, id),
            None => write!(f, "{}: missing", self.field),
        }
    }
}

/// Translate every legacy-integer field of a row through the mapping
/// tables, shared pool first, then the per-user pool. All unmapped fields
/// are reported together rather than one at a time.
pub fn translate(
    row: &LegacySessionRow,
    shared: &SharedMappings,
    user: &UserMappings,
) -> Result<SessionRow, Vec<UnmappedField>> {
    let mut unmapped = Vec::new();

    let skater_id = match row.skater_id {
        Some(legacy) => lookup("skater_id", legacy, None, Some(&user.skaters), true, &mut unmapped),
        None => {
            unmapped.push(UnmappedField {
                field: "skater_id",
                legacy_id: None,
                critical: true,
            });
            None
        }
    };

    let skate_type = row.skate_type.and_then(|legacy| {
        lookup("skate_type", legacy, Some(&shared.session_types), None, true, &mut unmapped)
    });
    let rink_id = row.rink_id.and_then(|legacy| {
        lookup("rink_id", legacy, Some(&shared.locations), None, false, &mut unmapped)
    });
    let coach_id = row.coach_id.and_then(|legacy| {
        lookup("coach_id", legacy, Some(&shared.coaches), None, false, &mut unmapped)
    });
    let config_id = row.config_id.and_then(|legacy| {
        lookup("config_id", legacy, None, Some(&user.skate_configs), false, &mut unmapped)
    });

    if !unmapped.is_empty() {
        return Err(unmapped);
    }

    Ok(SessionRow {
        // The legacy row id never survives translation; the target schema
        // generates its own.
        id: None,
        skater_id: skater_id.unwrap_or_default(),
        date: row.date.clone(),
        minutes: row.minutes,
        rink_id,
        coach_id,
        skate_type,
        config_id,
        cost: row.cost,
    })
}

/// Layered lookup: the shared pool is consulted before the per-user pool.
fn lookup(
    field: &'static str,
    legacy: i64,
    shared: Option<&HashMap<i64, String>>,
    user: Option<&HashMap<i64, String>>,
    critical: bool,
    unmapped: &mut Vec<UnmappedField>,
) -> Option<String> {
    let hit = shared
        .and_then(|m| m.get(&legacy))
        .or_else(|| user.and_then(|m| m.get(&legacy)));

    match hit {
        Some(target) => Some(target.clone()),
        None => {
            unmapped.push(UnmappedField {
                field,
                legacy_id: Some(legacy),
                critical,
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> SharedMappings {
        SharedMappings {
            locations: HashMap::from([(1, "r-1".to_string())]),
            coaches: HashMap::from([(5, "c-1".to_string())]),
            session_types: HashMap::from([(1, "freestyle".to_string())]),
        }
    }

    fn user() -> UserMappings {
        UserMappings {
            skaters: HashMap::from([(42, "u-a".to_string())]),
            skate_configs: HashMap::from([(3, "C1".to_string())]),
        }
    }

    fn row() -> LegacySessionRow {
        LegacySessionRow {
            id: Some(17),
            skater_id: Some(42),
            date: "2025-11-02".to_string(),
            minutes: Some(60),
            rink_id: Some(1),
            coach_id: Some(5),
            skate_type: Some(1),
            config_id: Some(3),
            cost: Some(14.0),
        }
    }

    #[test]
    fn test_translate_maps_every_field() {
        let out = translate(&row(), &shared(), &user()).unwrap();
        assert_eq!(out.skater_id, "u-a");
        assert_eq!(out.rink_id.as_deref(), Some("r-1"));
        assert_eq!(out.coach_id.as_deref(), Some("c-1"));
        assert_eq!(out.skate_type.as_deref(), Some("freestyle"));
        assert_eq!(out.config_id.as_deref(), Some("C1"));
        assert_eq!(out.id, None);
    }

    #[test]
    fn test_translate_is_deterministic() {
        let a = translate(&row(), &shared(), &user()).unwrap();
        let b = translate(&row(), &shared(), &user()).unwrap();
        assert_eq!(a.skater_id, b.skater_id);
        assert_eq!(a.rink_id, b.rink_id);
        assert_eq!(a.skate_type, b.skate_type);
        assert_eq!(a.config_id, b.config_id);
    }

    #[test]
    fn test_unmapped_skater_is_critical() {
        let mut r = row();
        r.skater_id = Some(7);
        let errs = translate(&r, &shared(), &user()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].critical);
        assert_eq!(errs[0].legacy_id, Some(7));
    }

    #[test]
    fn test_unmapped_coach_is_not_critical() {
        let mut r = row();
        r.coach_id = Some(99);
        let errs = translate(&r, &shared(), &user()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(!errs[0].critical);
        assert_eq!(errs[0].field, "coach_id");
    }

    #[test]
    fn test_all_unmapped_fields_reported_together() {
        let mut r = row();
        r.rink_id = Some(99);
        r.coach_id = Some(98);
        r.config_id = Some(97);
        let errs = translate(&r, &shared(), &user()).unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(errs.iter().all(|e| !e.critical));
    }

    #[test]
    fn test_optional_fields_pass_through_when_absent() {
        let mut r = row();
        r.coach_id = None;
        r.config_id = None;
        let out = translate(&r, &shared(), &user()).unwrap();
        assert!(out.coach_id.is_none());
        assert!(out.config_id.is_none());
    }
}
