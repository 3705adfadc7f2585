//! Cross-checks every reference-shaped field in a user's fixture set.
//!
//! References resolve first against sibling records in the same document
//! set (a skate config's boot must exist in the same equipment document),
//! then against the pooled reference index. The pass is total: every
//! document is visited and every problem reported, not just the first.
//! The report is advisory data -- `restore` aborts on a non-empty report
//! before any write, `validate` just prints it.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::fixtures::{self, EquipmentDocument, UserDocuments};
use crate::refstore::{RefKind, ReferenceIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Logical document name, e.g. `equipment.yaml`.
    pub document: String,
    /// Field path within the document, e.g. `configs[0].boot_id`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.document, self.field, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    fn unresolved(&mut self, document: &str, field: String, id: &str) {
        self.issues.push(Issue {
            document: document.to_string(),
            field,
            message: format!("unresolved reference ({})", id),
        });
    }

    fn problem(&mut self, document: &str, field: &str, message: String) {
        self.issues.push(Issue {
            document: document.to_string(),
            field: field.to_string(),
            message,
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// Which per-user documents are about to be written and therefore get
/// their references checked. Sibling resolution always sees the full
/// document set, so a maintenance-only pass still resolves blade ids
/// against an equipment document that is not itself in scope.
#[derive(Debug, Clone, Copy)]
pub struct DocumentScope {
    pub profile: bool,
    pub equipment: bool,
    pub memberships: bool,
    pub maintenance: bool,
}

impl DocumentScope {
    pub fn all() -> Self {
        Self {
            profile: true,
            equipment: true,
            memberships: true,
            maintenance: true,
        }
    }
}

/// Validate already-parsed user documents against the reference index.
pub fn validate(docs: &UserDocuments, index: &ReferenceIndex) -> ValidationReport {
    validate_scoped(docs, index, DocumentScope::all())
}

/// Like [`validate`], but only reports problems in the documents the
/// scope names. Out-of-scope documents still serve as sibling context.
pub fn validate_scoped(
    docs: &UserDocuments,
    index: &ReferenceIndex,
    scope: DocumentScope,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let equipment_ids = docs.equipment.as_ref().map(EquipmentIds::collect);

    if let Some(profile) = docs.profile.as_ref().filter(|_| scope.profile) {
        check_pooled(&mut report, "profile.yaml", "active_coach", RefKind::Coach, profile.active_coach.as_deref(), index);
        check_pooled(&mut report, "profile.yaml", "rink_pref", RefKind::Location, profile.rink_pref.as_deref(), index);
        check_pooled(&mut report, "profile.yaml", "club", RefKind::Club, profile.club.as_deref(), index);

        for (field, combo) in [("combo_ice", &profile.combo_ice), ("combo_off", &profile.combo_off)] {
            if let Some(id) = combo {
                let known = equipment_ids
                    .as_ref()
                    .map(|e| e.configs.contains(id.as_str()))
                    .unwrap_or(false);
                if !known {
                    report.unresolved("profile.yaml", field.to_string(), id);
                }
            }
        }
    }

    if let (Some(equipment), Some(ids), true) = (&docs.equipment, &equipment_ids, scope.equipment) {
        for (i, config) in equipment.configs.iter().enumerate() {
            if !ids.boots.contains(config.boot_id.as_str()) {
                report.unresolved(
                    "equipment.yaml",
                    format!("configs[{}].boot_id", i),
                    &config.boot_id,
                );
            }
            if !ids.blades.contains(config.blade_id.as_str()) {
                report.unresolved(
                    "equipment.yaml",
                    format!("configs[{}].blade_id", i),
                    &config.blade_id,
                );
            }
        }
    }

    if let Some(memberships) = docs.memberships.as_ref().filter(|_| scope.memberships) {
        for (i, m) in memberships.club_memberships.iter().enumerate() {
            check_pooled(&mut report, "memberships.yaml", &format!("club_memberships[{}].club_id", i), RefKind::Club, Some(&m.club_id), index);
        }
        for (i, p) in memberships.punch_cards.iter().enumerate() {
            check_pooled(&mut report, "memberships.yaml", &format!("punch_cards[{}].rink_id", i), RefKind::Location, Some(&p.rink_id), index);
        }
        for (i, l) in memberships.lts_classes.iter().enumerate() {
            check_pooled(&mut report, "memberships.yaml", &format!("lts_classes[{}].location_id", i), RefKind::Location, Some(&l.location_id), index);
        }
    }

    if let Some(maintenance) = docs.maintenance.as_ref().filter(|_| scope.maintenance) {
        for (i, m) in maintenance.iter().enumerate() {
            if let Some(blade_id) = &m.blade_id {
                let known = equipment_ids
                    .as_ref()
                    .map(|e| e.blades.contains(blade_id.as_str()))
                    .unwrap_or(false);
                if !known {
                    report.unresolved("maintenance.yaml", format!("[{}].blade_id", i), blade_id);
                }
            }
            if let Some(config_id) = &m.config_id {
                let known = equipment_ids
                    .as_ref()
                    .map(|e| e.configs.contains(config_id.as_str()))
                    .unwrap_or(false);
                if !known {
                    report.unresolved("maintenance.yaml", format!("[{}].config_id", i), config_id);
                }
            }
            check_pooled(&mut report, "maintenance.yaml", &format!("[{}].location", i), RefKind::Location, m.location.as_deref(), index);
        }
    }

    report
}

/// Parse and validate a user's whole fixture directory, collecting parse
/// failures as report entries so the pass stays total. Used by the
/// `validate` command.
pub fn validate_tree(user_dir: &Path, index: &ReferenceIndex) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut docs = UserDocuments::default();

    macro_rules! load {
        ($slot:ident, $file:expr) => {
            let path = user_dir.join($file);
            if path.exists() {
                match fixtures::parse_document(&path) {
                    Ok(doc) => docs.$slot = Some(doc),
                    Err(err) => report.problem($file, "-", format!("{:#}", err)),
                }
            }
        };
    }

    load!(auth, "auth.yaml");
    load!(profile, "profile.yaml");
    load!(equipment, "equipment.yaml");
    load!(memberships, "memberships.yaml");
    load!(maintenance, "maintenance.yaml");

    if docs.auth.is_none() && !user_dir.join("auth.yaml").exists() {
        report.problem("auth.yaml", "-", "not found (required for restore)".to_string());
    }
    if docs.profile.is_none() && !user_dir.join("profile.yaml").exists() {
        report.problem("profile.yaml", "-", "not found (required for restore)".to_string());
    }

    let mut cross = validate(&docs, index);
    report.issues.append(&mut cross.issues);
    report
}

struct EquipmentIds {
    boots: HashSet<String>,
    blades: HashSet<String>,
    configs: HashSet<String>,
}

impl EquipmentIds {
    fn collect(doc: &EquipmentDocument) -> Self {
        Self {
            boots: doc.boots.iter().map(|b| b.boot_id.clone()).collect(),
            blades: doc.blades.iter().map(|b| b.blade_id.clone()).collect(),
            configs: doc.configs.iter().map(|c| c.config_id.clone()).collect(),
        }
    }
}

fn check_pooled(
    report: &mut ValidationReport,
    document: &str,
    field: &str,
    kind: RefKind,
    id: Option<&str>,
    index: &ReferenceIndex,
) {
    if let Some(id) = id {
        if !index.exists(kind, id) {
            report.unresolved(document, field.to_string(), id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    fn index_with(coach: &str, rink: &str, club: &str) -> ReferenceIndex {
        ReferenceIndex::from_fixtures(&PooledFixtures {
            coaches: vec![CoachFixture {
                coach_id: coach.into(),
                first_name: "Viktor".into(),
                last_name: "Petrov".into(),
                rate: None,
            }],
            locations: vec![LocationFixture {
                rink_id: rink.into(),
                name: "Winter Garden".into(),
                ice_cost: None,
                date_created: None,
            }],
            clubs: vec![ClubFixture {
                club_id: club.into(),
                name: "Glide FSC".into(),
                home_rink: None,
                annual_cost: None,
            }],
        })
    }

    fn boot(id: &str) -> BootFixture {
        BootFixture {
            boot_id: id.into(),
            model: "Edea Ice Fly".into(),
            size: None,
            purchase_date: None,
            cost: None,
        }
    }

    fn blade(id: &str) -> BladeFixture {
        BladeFixture {
            blade_id: id.into(),
            model: "Gold Seal".into(),
            size: None,
            purchase_date: None,
            cost: None,
        }
    }

    fn config(id: &str, boot: &str, blade: &str) -> SkateConfigFixture {
        SkateConfigFixture {
            config_id: id.into(),
            boot_id: boot.into(),
            blade_id: blade.into(),
            label: None,
        }
    }

    #[test]
    fn test_clean_documents_produce_empty_report() {
        let docs = UserDocuments {
            equipment: Some(EquipmentDocument {
                boots: vec![boot("B1")],
                blades: vec![blade("L1")],
                configs: vec![config("C1", "B1", "L1")],
            }),
            memberships: Some(MembershipsDocument {
                club_memberships: vec![ClubMembershipFixture {
                    club_id: "k-1".into(),
                    joined_date: None,
                    expiration_date: None,
                    fee: None,
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        let report = validate(&docs, &index_with("c-1", "r-1", "k-1"));
        assert!(report.is_empty(), "unexpected issues: {}", report);
    }

    #[test]
    fn test_dangling_boot_reference_is_reported_once() {
        let docs = UserDocuments {
            equipment: Some(EquipmentDocument {
                boots: vec![],
                blades: vec![blade("L1")],
                configs: vec![config("C1", "B1", "L1")],
            }),
            ..Default::default()
        };

        let report = validate(&docs, &index_with("c-1", "r-1", "k-1"));
        assert_eq!(report.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.document, "equipment.yaml");
        assert_eq!(issue.field, "configs[0].boot_id");
        assert_eq!(issue.message, "unresolved reference (B1)");
    }

    #[test]
    fn test_all_problems_are_aggregated() {
        let docs = UserDocuments {
            profile: Some(ProfileDocument {
                first_name: "Sparkle".into(),
                middle_name: None,
                last_name: "Skater".into(),
                city: None,
                state: None,
                country: None,
                zip: None,
                tz: None,
                roles: vec![],
                combo_ice: None,
                combo_off: None,
                rink_pref: Some("r-missing".into()),
                maint_interval: None,
                active_coach: Some("c-missing".into()),
                club: None,
                club_join_date: None,
                usfsa_number: None,
            }),
            equipment: Some(EquipmentDocument {
                boots: vec![boot("B1")],
                blades: vec![],
                configs: vec![config("C1", "B2", "L9")],
            }),
            ..Default::default()
        };

        let report = validate(&docs, &index_with("c-1", "r-1", "k-1"));
        // Two profile issues plus the config's boot and blade: validation
        // keeps going after the first failure.
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_maintenance_resolves_against_siblings_then_pool() {
        let docs = UserDocuments {
            equipment: Some(EquipmentDocument {
                boots: vec![boot("B1")],
                blades: vec![blade("L1")],
                configs: vec![config("C1", "B1", "L1")],
            }),
            maintenance: Some(vec![MaintenanceFixture {
                date: "2026-01-05".into(),
                blade_id: Some("L1".into()),
                config_id: Some("C9".into()),
                location: Some("r-1".into()),
                kind: Some("sharpening".into()),
                cost: Some(25.0),
                notes: None,
            }]),
            ..Default::default()
        };

        let report = validate(&docs, &index_with("c-1", "r-1", "k-1"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues[0].field, "[0].config_id");
    }

    #[test]
    fn test_validate_tree_collects_parse_errors_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("auth.yaml"), "login: [broken\n").unwrap();
        std::fs::write(
            dir.path().join("memberships.yaml"),
            "club_memberships:\n  - club_id: k-missing\n",
        )
        .unwrap();

        let report = validate_tree(dir.path(), &index_with("c-1", "r-1", "k-1"));
        assert_eq!(report.len(), 3);
        assert_eq!(report.issues[0].document, "auth.yaml");
        assert_eq!(report.issues[1].document, "profile.yaml");
        assert_eq!(report.issues[2].field, "club_memberships[0].club_id");
    }

    #[test]
    fn test_validate_tree_flags_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("auth.yaml"),
            "login: sparkles\nemail: s@example.com\npassword: x\n",
        )
        .unwrap();

        let report = validate_tree(dir.path(), &index_with("c-1", "r-1", "k-1"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues[0].document, "profile.yaml");
        assert_eq!(report.issues[0].message, "not found (required for restore)");
    }

    #[test]
    fn test_out_of_scope_documents_are_not_checked_but_still_resolve_siblings() {
        let docs = UserDocuments {
            equipment: Some(EquipmentDocument {
                boots: vec![],
                blades: vec![blade("L1")],
                configs: vec![config("C1", "B-gone", "L1")],
            }),
            maintenance: Some(vec![MaintenanceFixture {
                date: "2026-01-05".into(),
                blade_id: Some("L1".into()),
                config_id: Some("C1".into()),
                location: None,
                kind: Some("sharpening".into()),
                cost: None,
                notes: None,
            }]),
            ..Default::default()
        };
        let index = index_with("c-1", "r-1", "k-1");

        // The dangling boot only matters when equipment itself is in scope.
        assert_eq!(validate(&docs, &index).len(), 1);

        let scope = DocumentScope {
            profile: false,
            equipment: false,
            memberships: false,
            maintenance: true,
        };
        let report = validate_scoped(&docs, &index, scope);
        assert!(report.is_empty(), "unexpected issues: {}", report);
    }
}
