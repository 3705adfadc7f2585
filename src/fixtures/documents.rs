//! Typed fixture documents. Fixtures are a contract, not free-form data:
//! every document rejects unknown fields, and per-user documents are
//! id-less -- the skater id is injected by the restore orchestrator.

use serde::Deserialize;

/// The three shared pooled documents, loaded together.
#[derive(Debug, Clone)]
pub struct PooledFixtures {
    pub coaches: Vec<CoachFixture>,
    pub locations: Vec<LocationFixture>,
    pub clubs: Vec<ClubFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoachFixture {
    pub coach_id: String,
    pub first_name: String,
    pub last_name: String,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationFixture {
    pub rink_id: String,
    pub name: String,
    pub ice_cost: Option<f64>,
    /// Defaults to the restore timestamp when absent.
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClubFixture {
    pub club_id: String,
    pub name: String,
    pub home_rink: Option<String>,
    pub annual_cost: Option<f64>,
}

/// Every per-user document found for one user. Only `auth.yaml` is required
/// for a restore; the rest are optional files.
#[derive(Debug, Clone, Default)]
pub struct UserDocuments {
    pub auth: Option<AuthDocument>,
    pub profile: Option<ProfileDocument>,
    pub equipment: Option<EquipmentDocument>,
    pub memberships: Option<MembershipsDocument>,
    pub maintenance: Option<Vec<MaintenanceFixture>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthDocument {
    pub login: String,
    pub email: String,
    /// Plaintext only in the fixture; hashed before it reaches the database.
    pub password: String,
    /// Absent for a brand-new user; the auth step generates one.
    pub skater_id: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub tz: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub combo_ice: Option<String>,
    pub combo_off: Option<String>,
    pub rink_pref: Option<String>,
    pub maint_interval: Option<i64>,
    pub active_coach: Option<String>,
    pub club: Option<String>,
    pub club_join_date: Option<String>,
    pub usfsa_number: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentDocument {
    #[serde(default)]
    pub boots: Vec<BootFixture>,
    #[serde(default)]
    pub blades: Vec<BladeFixture>,
    #[serde(default)]
    pub configs: Vec<SkateConfigFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootFixture {
    pub boot_id: String,
    pub model: String,
    pub size: Option<String>,
    pub purchase_date: Option<String>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BladeFixture {
    pub blade_id: String,
    pub model: String,
    pub size: Option<String>,
    pub purchase_date: Option<String>,
    pub cost: Option<f64>,
}

/// A composite skate config pairing a boot and a blade. Both must exist in
/// the same equipment document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkateConfigFixture {
    pub config_id: String,
    pub boot_id: String,
    pub blade_id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipsDocument {
    #[serde(default)]
    pub club_memberships: Vec<ClubMembershipFixture>,
    #[serde(default)]
    pub punch_cards: Vec<PunchCardFixture>,
    #[serde(default)]
    pub lts_classes: Vec<LtsClassFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClubMembershipFixture {
    pub club_id: String,
    pub joined_date: Option<String>,
    pub expiration_date: Option<String>,
    pub fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PunchCardFixture {
    pub rink_id: String,
    pub punches: Option<i64>,
    pub cost: Option<f64>,
    pub purchase_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LtsClassFixture {
    pub location_id: String,
    pub class_name: String,
    pub cost: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceFixture {
    pub date: String,
    pub blade_id: Option<String>,
    pub config_id: Option<String>,
    pub location: Option<String>,
    pub kind: Option<String>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}
