//! Storage capability used by the import services.
//!
//! The reconcilers never talk to the database directly: they receive a
//! `&mut dyn Store` so the same logic runs against Postgres in production
//! and against the in-memory store in unit tests. All operations are
//! synchronous and return the live entity state immediately after a write.
//!
//! Transactions are an explicit unit of work: an importer opens one, applies
//! its row mutations, and commits or rolls back deterministically. Row-level
//! business errors never abort a transaction; only store faults do.
//!
//! Known gap: concurrent imports racing on the same get-or-create key
//! (meter number, tenant name, contract name) can double-create. Imports
//! are expected to run one at a time.

use chrono::NaiveDate;

use crate::models::{
    Building, Contract, ElectricShield, ElectricityMeter, ElectricityReading, Pavilion,
    PavilionStatus, Tenant,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Error raised by store operations. These are faults, not business errors:
/// an importer that sees one rolls back and reports the import as failed.
#[derive(Debug, Clone)]
pub enum StoreError {
    Connection(String),
    Query(String),
    Transaction(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "Connection error: {}", msg),
            StoreError::Query(msg) => write!(f, "Query error: {}", msg),
            StoreError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Relational-store operations the import services are built on:
/// get-or-create by unique key, filter by field equality (optionally scoped
/// to a relation), existence checks and conditional updates.
pub trait Store {
    // --- unit of work ---
    fn begin_transaction(&mut self) -> Result<(), StoreError>;
    fn commit_transaction(&mut self) -> Result<(), StoreError>;
    fn rollback_transaction(&mut self) -> Result<(), StoreError>;

    // --- buildings ---
    fn get_building(&mut self, id: i32) -> Result<Option<Building>, StoreError>;
    fn get_or_create_building(&mut self, name: &str) -> Result<Building, StoreError>;

    // --- pavilions (pre-existing rows; the importers only update them) ---
    fn find_pavilion_by_name(
        &mut self,
        name: &str,
        building_id: Option<i32>,
    ) -> Result<Option<Pavilion>, StoreError>;
    fn pavilion_exists(&mut self, building_id: i32, name: &str) -> Result<bool, StoreError>;
    fn create_pavilion(
        &mut self,
        building_id: i32,
        name: &str,
        area: f64,
        status: PavilionStatus,
    ) -> Result<Pavilion, StoreError>;
    fn update_pavilion_occupancy(
        &mut self,
        pavilion_id: i32,
        building_id: i32,
        tenant_id: i32,
        contract_id: i32,
        status: PavilionStatus,
    ) -> Result<(), StoreError>;

    // --- tenants ---
    fn get_or_create_tenant(&mut self, name: &str, inn: &str)
        -> Result<(Tenant, bool), StoreError>;
    fn update_tenant_inn(&mut self, tenant_id: i32, inn: &str) -> Result<(), StoreError>;

    // --- contracts ---
    fn get_or_create_contract(&mut self, name: &str) -> Result<(Contract, bool), StoreError>;

    // --- electric shields ---
    fn get_or_create_shield(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<(ElectricShield, bool), StoreError>;

    // --- meters ---
    fn find_meter_by_number(
        &mut self,
        meter_number: &str,
    ) -> Result<Option<ElectricityMeter>, StoreError>;
    fn create_meter(
        &mut self,
        meter_number: &str,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<ElectricityMeter, StoreError>;
    fn update_meter(
        &mut self,
        meter_id: i32,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<(), StoreError>;
    /// Replaces the meter's pavilion links with exactly the given set.
    fn set_meter_pavilions(
        &mut self,
        meter_id: i32,
        pavilion_ids: &[i32],
    ) -> Result<(), StoreError>;
    fn set_meter_shield(&mut self, meter_id: i32, shield_id: i32) -> Result<(), StoreError>;

    // --- readings ---
    fn reading_exists(&mut self, meter_id: i32, date: NaiveDate) -> Result<bool, StoreError>;
    /// Most recent reading strictly before `date` for the meter.
    fn latest_reading_before(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
    ) -> Result<Option<ElectricityReading>, StoreError>;
    fn create_reading(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
        meter_reading: f64,
        consumption: f64,
    ) -> Result<ElectricityReading, StoreError>;
}
