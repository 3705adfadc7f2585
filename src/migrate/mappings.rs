//! Precomputed identifier mapping tables for the one-time legacy migration.
//!
//! Two pools: shared (locations, coaches, session types -- identical for
//! every user) and per-user (skater id, skate-config ids). Both are
//! read-only inputs; the restore path never writes them.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::fixtures::parse_document;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedMappings {
    #[serde(default)]
    pub locations: HashMap<i64, String>,
    #[serde(default)]
    pub coaches: HashMap<i64, String>,
    #[serde(default)]
    pub session_types: HashMap<i64, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMappings {
    #[serde(default)]
    pub skaters: HashMap<i64, String>,
    #[serde(default)]
    pub skate_configs: HashMap<i64, String>,
}

pub fn load_shared(path: &Path) -> Result<SharedMappings> {
    anyhow::ensure!(path.exists(), "Shared mappings not found at {:?}", path);
    parse_document(path)
}

pub fn load_user(path: &Path) -> Result<UserMappings> {
    anyhow::ensure!(path.exists(), "User mappings not found at {:?}", path);
    parse_document(path)
}
