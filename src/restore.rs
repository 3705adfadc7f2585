//! Step orchestrator for fixture restore.
//!
//! Steps run in a fixed dependency order, each inside its own transaction:
//! a failed step rolls back alone and already-committed steps stay put.
//! Before the first write, every document the requested steps would write
//! is validated; a non-empty report aborts with zero writes.

use anyhow::{bail, Context, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::Utc;
use clap::ValueEnum;
use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::fmt;
use uuid::Uuid;

use crate::fixtures::{DataPaths, PooledFixtures, UserDocuments};
use crate::import;
use crate::refstore::{self, ReferenceIndex};
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    Pooled,
    Auth,
    Profile,
    Equipment,
    Memberships,
    Maintenance,
    Sessions,
}

/// The fixed dependency order. `--all` expands to exactly this sequence,
/// and explicitly requested steps are re-sorted into it.
pub const STEP_ORDER: [Step; 7] = [
    Step::Pooled,
    Step::Auth,
    Step::Profile,
    Step::Equipment,
    Step::Memberships,
    Step::Maintenance,
    Step::Sessions,
];

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Pooled => "pooled",
            Step::Auth => "auth",
            Step::Profile => "profile",
            Step::Equipment => "equipment",
            Step::Memberships => "memberships",
            Step::Maintenance => "maintenance",
            Step::Sessions => "sessions",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Default)]
pub struct StepReport {
    pub inserted: usize,
    pub note: Option<String>,
}

struct RestoreContext<'a> {
    paths: &'a DataPaths,
    username: &'a str,
    /// Resolved on first use. Pooled data is shared and needs no user
    /// identity, so a pooled-only restore never touches auth.yaml.
    skater_id: RefCell<Option<String>>,
    pooled: &'a PooledFixtures,
    docs: &'a UserDocuments,
}

impl RestoreContext<'_> {
    fn skater_id(&self, conn: &Connection) -> Result<String> {
        if let Some(id) = self.skater_id.borrow().as_ref() {
            return Ok(id.clone());
        }
        let id = resolve_user_id(conn, self.docs)?;
        *self.skater_id.borrow_mut() = Some(id.clone());
        Ok(id)
    }
}

/// Run the requested steps for one user. Steps are attempted independently:
/// a failure rolls back that step, is reported, and later requested steps
/// still run; the call errors at the end if anything failed.
pub fn restore(
    conn: &mut Connection,
    paths: &DataPaths,
    username: &str,
    requested: &[Step],
) -> Result<()> {
    let pooled = crate::fixtures::load_pooled(&paths.pooled_dir())?;
    let docs = crate::fixtures::load_user(&paths.user_dir(username))?;

    let index = ReferenceIndex::load(conn, &pooled)?;
    let scope = validate::DocumentScope {
        profile: requested.contains(&Step::Profile),
        equipment: requested.contains(&Step::Equipment),
        memberships: requested.contains(&Step::Memberships),
        maintenance: requested.contains(&Step::Maintenance),
    };
    let report = validate::validate_scoped(&docs, &index, scope);
    if !report.is_empty() {
        println!("ABORT -- {} unresolved reference(s):\n{}", report.len(), report);
        bail!("validation failed with {} issue(s)", report.len());
    }
    println!("All references OK\n");

    let ctx = RestoreContext {
        paths,
        username,
        skater_id: RefCell::new(None),
        pooled: &pooled,
        docs: &docs,
    };

    let mut failures = 0usize;
    for step in STEP_ORDER {
        if !requested.contains(&step) {
            continue;
        }
        println!("[{}]", step);
        match run_step(conn, step, &ctx) {
            Ok(report) => {
                match report.note {
                    Some(note) => println!("  {} inserted, {}", report.inserted, note),
                    None => println!("  {} inserted", report.inserted),
                }
            }
            Err(err) => {
                failures += 1;
                println!("  FAILED (rolled back): {:#}", err);
            }
        }
        println!();
    }

    if failures > 0 {
        bail!("{} step(s) failed", failures);
    }
    Ok(())
}

/// The user id is established once, from auth.yaml or the existing user
/// row, and injected into every per-user record. Per-user documents never
/// carry their own copy.
fn resolve_user_id(conn: &Connection, docs: &UserDocuments) -> Result<String> {
    let auth = docs
        .auth
        .as_ref()
        .context("auth.yaml is required to resolve the user identity")?;

    if let Some(id) = &auth.skater_id {
        return Ok(id.clone());
    }

    let existing: Option<String> = conn
        .query_row(
            "SELECT skater_id FROM users WHERE login = ?1",
            [&auth.login],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    // Brand-new user with no declared id: mint one. The auth step persists
    // it; until then it only lives in this invocation.
    let id = Uuid::new_v4().to_string();
    println!("  Generated new skater id {} for '{}'", id, auth.login);
    Ok(id)
}

/// Resolve the skater id for commands that need an already-established
/// identity (migrate and the bulk imports): the id declared in auth.yaml
/// first, then the users table by login. Never mints a new id.
pub fn lookup_user_id(conn: &Connection, paths: &DataPaths, username: &str) -> Result<String> {
    let auth_path = paths.user_dir(username).join("auth.yaml");
    anyhow::ensure!(auth_path.exists(), "No auth.yaml found at {:?}", auth_path);

    let auth: crate::fixtures::AuthDocument = crate::fixtures::parse_document(&auth_path)?;
    if let Some(id) = auth.skater_id {
        return Ok(id);
    }

    conn.query_row(
        "SELECT skater_id FROM users WHERE login = ?1",
        [&auth.login],
        |row| row.get(0),
    )
    .with_context(|| {
        format!(
            "Cannot resolve skater id for '{}': no skater_id in auth.yaml and no user row",
            username
        )
    })
}

fn run_step(conn: &mut Connection, step: Step, ctx: &RestoreContext) -> Result<StepReport> {
    match step {
        Step::Pooled => step_pooled(conn, ctx),
        Step::Auth => step_auth(conn, ctx),
        Step::Profile => step_profile(conn, ctx),
        Step::Equipment => step_equipment(conn, ctx),
        Step::Memberships => step_memberships(conn, ctx),
        Step::Maintenance => step_maintenance(conn, ctx),
        Step::Sessions => step_sessions(conn, ctx),
    }
}

/// Shared reference data: coaches, locations, clubs. Skipped entirely when
/// the pools already hold more than the baseline seed rows, so a second
/// user's restore cannot duplicate shared rows.
fn step_pooled(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    if refstore::is_populated_beyond_defaults(conn)? {
        return Ok(StepReport {
            inserted: 0,
            note: Some("pooled already populated".to_string()),
        });
    }

    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let tx = conn.transaction()?;
    let mut inserted = 0usize;

    for coach in &ctx.pooled.coaches {
        tx.execute(
            "INSERT INTO coaches(coach_id, first_name, last_name, rate) VALUES(?1, ?2, ?3, ?4)",
            rusqlite::params![coach.coach_id, coach.first_name, coach.last_name, coach.rate],
        )?;
        inserted += 1;
    }
    for location in &ctx.pooled.locations {
        tx.execute(
            "INSERT INTO locations(rink_id, name, ice_cost, date_created) VALUES(?1, ?2, ?3, ?4)",
            rusqlite::params![
                location.rink_id,
                location.name,
                location.ice_cost,
                location.date_created.as_deref().unwrap_or(&now),
            ],
        )?;
        inserted += 1;
    }
    for club in &ctx.pooled.clubs {
        tx.execute(
            "INSERT INTO clubs(club_id, name, home_rink, annual_cost) VALUES(?1, ?2, ?3, ?4)",
            rusqlite::params![club.club_id, club.name, club.home_rink, club.annual_cost],
        )?;
        inserted += 1;
    }

    tx.commit()?;
    Ok(StepReport { inserted, note: None })
}

/// Create the user row, hashing the plaintext credential on the way in.
/// Plaintext never reaches the database.
fn step_auth(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let auth = ctx
        .docs
        .auth
        .as_ref()
        .context("auth.yaml not found")?;

    let skater_id = ctx.skater_id(conn)?;
    let hashed = hash_password(&auth.password)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users(skater_id, login, email, phone, password_hash) VALUES(?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![skater_id, auth.login, auth.email, auth.phone, hashed],
    )?;
    tx.commit()?;

    println!("  Created auth for '{}' ({})", auth.login, skater_id);
    Ok(StepReport { inserted: 1, note: None })
}

fn step_profile(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let profile = ctx
        .docs
        .profile
        .as_ref()
        .context("profile.yaml not found")?;

    let skater_id = ctx.skater_id(conn)?;
    let roles = serde_json::to_string(&profile.roles)?;
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO profiles(
            skater_id, first_name, middle_name, last_name, city, state, country, zip,
            tz, roles, combo_ice, combo_off, rink_pref, maint_interval, active_coach,
            club_id, club_join_date, usfsa_number, date_created
        ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        rusqlite::params![
            skater_id,
            profile.first_name,
            profile.middle_name,
            profile.last_name,
            profile.city,
            profile.state,
            profile.country,
            profile.zip,
            profile.tz.as_deref().unwrap_or("UTC"),
            roles,
            profile.combo_ice,
            profile.combo_off,
            profile.rink_pref,
            profile.maint_interval,
            profile.active_coach,
            profile.club,
            profile.club_join_date,
            profile.usfsa_number,
            now,
        ],
    )?;
    tx.commit()?;

    println!("  Loaded profile for {} {}", profile.first_name, profile.last_name);
    Ok(StepReport { inserted: 1, note: None })
}

fn require_profile(conn: &Connection, username: &str, skater_id: &str) -> Result<()> {
    anyhow::ensure!(
        crate::db::profile_exists(conn, skater_id)?,
        "profile for '{}' not present; run the profile step first",
        username
    );
    Ok(())
}

fn step_equipment(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let skater_id = ctx.skater_id(conn)?;
    require_profile(conn, ctx.username, &skater_id)?;
    let equipment = match &ctx.docs.equipment {
        Some(doc) => doc,
        None => {
            return Ok(StepReport {
                inserted: 0,
                note: Some("no equipment.yaml, skipping".to_string()),
            })
        }
    };

    let tx = conn.transaction()?;
    let mut inserted = 0usize;

    for boot in &equipment.boots {
        tx.execute(
            "INSERT INTO boots(boot_id, skater_id, model, size, purchase_date, cost)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                boot.boot_id,
                skater_id,
                boot.model,
                boot.size,
                boot.purchase_date,
                boot.cost
            ],
        )?;
        inserted += 1;
    }
    for blade in &equipment.blades {
        tx.execute(
            "INSERT INTO blades(blade_id, skater_id, model, size, purchase_date, cost)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                blade.blade_id,
                skater_id,
                blade.model,
                blade.size,
                blade.purchase_date,
                blade.cost
            ],
        )?;
        inserted += 1;
    }
    for config in &equipment.configs {
        tx.execute(
            "INSERT INTO skate_configs(config_id, skater_id, boot_id, blade_id, label)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                config.config_id,
                skater_id,
                config.boot_id,
                config.blade_id,
                config.label
            ],
        )?;
        inserted += 1;
    }

    tx.commit()?;
    println!(
        "  Loaded {} boots, {} blades, {} skate configs",
        equipment.boots.len(),
        equipment.blades.len(),
        equipment.configs.len()
    );
    Ok(StepReport { inserted, note: None })
}

fn step_memberships(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let skater_id = ctx.skater_id(conn)?;
    require_profile(conn, ctx.username, &skater_id)?;
    let memberships = match &ctx.docs.memberships {
        Some(doc) => doc,
        None => {
            return Ok(StepReport {
                inserted: 0,
                note: Some("no memberships.yaml, skipping".to_string()),
            })
        }
    };

    let tx = conn.transaction()?;
    let mut inserted = 0usize;

    for m in &memberships.club_memberships {
        tx.execute(
            "INSERT INTO club_members(skater_id, club_id, joined_date, expiration_date, fee)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![skater_id, m.club_id, m.joined_date, m.expiration_date, m.fee],
        )?;
        inserted += 1;
    }
    for p in &memberships.punch_cards {
        tx.execute(
            "INSERT INTO punch_cards(skater_id, rink_id, punches, cost, purchase_date)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![skater_id, p.rink_id, p.punches, p.cost, p.purchase_date],
        )?;
        inserted += 1;
    }
    for l in &memberships.lts_classes {
        tx.execute(
            "INSERT INTO lts_classes(skater_id, location_id, class_name, cost, start_date, end_date)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                skater_id,
                l.location_id,
                l.class_name,
                l.cost,
                l.start_date,
                l.end_date
            ],
        )?;
        inserted += 1;
    }

    tx.commit()?;
    Ok(StepReport { inserted, note: None })
}

fn step_maintenance(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let skater_id = ctx.skater_id(conn)?;
    require_profile(conn, ctx.username, &skater_id)?;
    let records = match &ctx.docs.maintenance {
        Some(records) => records,
        None => {
            return Ok(StepReport {
                inserted: 0,
                note: Some("no maintenance.yaml, skipping".to_string()),
            })
        }
    };

    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    for m in records {
        tx.execute(
            "INSERT INTO maintenance(skater_id, blade_id, config_id, date, location, kind, cost, notes)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                skater_id,
                m.blade_id,
                m.config_id,
                m.date,
                m.location,
                m.kind,
                m.cost,
                m.notes
            ],
        )?;
        inserted += 1;
    }

    tx.commit()?;
    Ok(StepReport { inserted, note: None })
}

/// Load every post-migration session CSV under `sessions/<user>/` through
/// the bulk importer (one transaction per file).
fn step_sessions(conn: &mut Connection, ctx: &RestoreContext) -> Result<StepReport> {
    let sessions_dir = ctx.paths.sessions_dir(ctx.username);
    if !sessions_dir.is_dir() {
        return Ok(StepReport {
            inserted: 0,
            note: Some(format!("no sessions directory at {:?}", sessions_dir)),
        });
    }

    let mut csv_files: Vec<_> = std::fs::read_dir(&sessions_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    csv_files.sort();

    if csv_files.is_empty() {
        return Ok(StepReport {
            inserted: 0,
            note: Some(format!("no CSV files in {:?}", sessions_dir)),
        });
    }

    let skater_id = ctx.skater_id(conn)?;
    let mut inserted = 0usize;
    for csv_file in &csv_files {
        let rows = import::read_session_csv(csv_file)?;
        let summary = import::import_sessions(conn, &rows, &skater_id)?;
        println!(
            "  {:?}: {}",
            csv_file.file_name().unwrap_or_default(),
            summary
        );
        inserted += summary.inserted;
    }

    Ok(StepReport { inserted, note: None })
}

fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("Failed to hash password: {}", err))?;
    Ok(hash.to_string())
}
