pub mod documents;
pub mod paths;

pub use documents::*;
pub use paths::*;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse one YAML fixture document into its typed form. Unknown fields are
/// rejected by the document types; parsing never consults the database.
pub fn parse_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {:?}", path))?;
    serde_yaml::from_str(&text).with_context(|| format!("Failed to parse fixture {:?}", path))
}

/// Load the shared pooled fixture documents (coaches, locations, clubs).
pub fn load_pooled(pooled_dir: &Path) -> Result<PooledFixtures> {
    Ok(PooledFixtures {
        coaches: parse_document(&pooled_dir.join("coaches.yaml"))?,
        locations: parse_document(&pooled_dir.join("locations.yaml"))?,
        clubs: parse_document(&pooled_dir.join("clubs.yaml"))?,
    })
}

/// Load every per-user fixture document present in the user's directory.
/// Missing optional files become `None`; a malformed file is an error.
pub fn load_user(user_dir: &Path) -> Result<UserDocuments> {
    anyhow::ensure!(
        user_dir.is_dir(),
        "No fixture directory found at {:?}",
        user_dir
    );

    Ok(UserDocuments {
        auth: parse_optional(user_dir, "auth.yaml")?,
        profile: parse_optional(user_dir, "profile.yaml")?,
        equipment: parse_optional(user_dir, "equipment.yaml")?,
        memberships: parse_optional(user_dir, "memberships.yaml")?,
        maintenance: parse_optional(user_dir, "maintenance.yaml")?,
    })
}

fn parse_optional<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Option<T>> {
    let path = dir.join(name);
    if path.exists() {
        Ok(Some(parse_document(&path)?))
    } else {
        Ok(None)
    }
}
