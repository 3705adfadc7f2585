use anyhow::{bail, Result};
use rinkadmin::{
    cli::{Cli, Commands},
    db,
    fixtures::{self, DataPaths},
    import, migrate,
    refstore::ReferenceIndex,
    restore::{self, STEP_ORDER},
    validate,
};
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let paths = DataPaths::resolve(cli.data_dir)?;
    let db_path = cli.db.unwrap_or_else(|| paths.default_db());

    match cli.command {
        Commands::Restore { username, all, steps } => {
            let requested: Vec<_> = if all {
                STEP_ORDER.to_vec()
            } else {
                steps
            };
            if requested.is_empty() {
                bail!("restore requires --all or at least one --step");
            }

            let start = Instant::now();
            let mut conn = db::open(&db_path)?;

            println!("Restoring '{}'\n", username);
            restore::restore(&mut conn, &paths, &username, &requested)?;

            println!("Done in {:.1}s", start.elapsed().as_secs_f64());
        }

        Commands::Migrate { username, csv } => {
            let mut conn = db::open(&db_path)?;
            let shared = migrate::load_shared(&paths.shared_mappings())?;
            let user_maps = migrate::load_user(&paths.user_mappings(&username))?;
            let skater_id = restore::lookup_user_id(&conn, &paths, &username)?;

            println!("Migrating legacy data for '{}'\n", username);
            let summary = migrate::run(&mut conn, &csv, &shared, &user_maps, &skater_id)?;
            println!("\n{}", summary);
        }

        Commands::ImportSessions { username, csv_path } => {
            let mut conn = db::open(&db_path)?;
            let skater_id = restore::lookup_user_id(&conn, &paths, &username)?;

            println!("Importing sessions for '{}'\n", username);
            let rows = import::read_session_csv(&csv_path)?;
            let summary = import::import_sessions(&mut conn, &rows, &skater_id)?;
            println!("{}", summary);
        }

        Commands::ImportMaintenance { username, csv_path } => {
            let mut conn = db::open(&db_path)?;
            let skater_id = restore::lookup_user_id(&conn, &paths, &username)?;

            println!("Importing maintenance for '{}'\n", username);
            let rows = import::read_maintenance_csv(&csv_path)?;
            let summary = import::import_maintenance(&mut conn, &rows, &skater_id)?;
            println!("{}", summary);
        }

        Commands::Validate { username } => {
            let pooled = fixtures::load_pooled(&paths.pooled_dir())?;
            // Validation never writes; only open the database if it is
            // already there, otherwise check against the fixtures alone.
            let index = if db_path.exists() {
                let conn = db::open(&db_path)?;
                ReferenceIndex::load(&conn, &pooled)?
            } else {
                ReferenceIndex::from_fixtures(&pooled)
            };

            println!("Validating fixtures for '{}'\n", username);
            let report = validate::validate_tree(&paths.user_dir(&username), &index);
            if report.is_empty() {
                println!("All fixtures valid for '{}'", username);
            } else {
                println!("ISSUES ({}):\n{}", report.len(), report);
                bail!("validation found {} issue(s)", report.len());
            }
        }
    }

    Ok(())
}
