use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A meter with no communication for longer than this is considered stale.
pub const STALE_VERIFICATION_HOURS: i32 = 720;

/// Pavilion occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PavilionStatus {
    Free,
    Rented,
    Reserved,
    Repair,
}

impl PavilionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PavilionStatus::Free => "free",
            PavilionStatus::Rented => "rented",
            PavilionStatus::Reserved => "reserved",
            PavilionStatus::Repair => "repair",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PavilionStatus::Free),
            "rented" => Some(PavilionStatus::Rented),
            "reserved" => Some(PavilionStatus::Reserved),
            "repair" => Some(PavilionStatus::Repair),
            _ => None,
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::buildings)]
pub struct Building {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::tenants)]
pub struct Tenant {
    pub id: i32,
    pub name: String,
    pub inn: String,
    pub phone: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::contracts)]
pub struct Contract {
    pub id: i32,
    pub name: String,
    pub contract_file: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::pavilions)]
pub struct Pavilion {
    pub id: i32,
    pub building_id: i32,
    pub name: String,
    pub row_label: String,
    pub area: f64,
    pub status: String,
    pub tenant_id: Option<i32>,
    pub contract_id: Option<i32>,
    pub tags: JsonValue,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Pavilion {
    pub fn is_occupied(&self) -> bool {
        matches!(
            PavilionStatus::from_str(&self.status),
            Some(PavilionStatus::Rented) | Some(PavilionStatus::Reserved)
        )
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::electric_shields)]
pub struct ElectricShield {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::electricity_meters)]
pub struct ElectricityMeter {
    pub id: i32,
    pub meter_number: String,
    pub serial_number: String,
    pub location: String,
    pub last_verified_hours_ago: Option<i32>,
    pub electric_shield_id: Option<i32>,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ElectricityMeter {
    /// A meter that never reported or reported too long ago counts as stale.
    pub fn is_stale(&self) -> bool {
        match self.last_verified_hours_ago {
            Some(hours) => hours > STALE_VERIFICATION_HOURS,
            None => true,
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::electricity_readings)]
pub struct ElectricityReading {
    pub id: i32,
    pub meter_id: i32,
    pub date: NaiveDate,
    pub meter_reading: f64,
    pub consumption: f64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

// ============================================================================
// Insertable rows (ids and timestamps come from the database defaults)
// ============================================================================

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::buildings)]
pub struct NewBuilding<'a> {
    pub name: &'a str,
    pub address: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::tenants)]
pub struct NewTenant<'a> {
    pub name: &'a str,
    pub inn: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::contracts)]
pub struct NewContract<'a> {
    pub name: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::pavilions)]
pub struct NewPavilion<'a> {
    pub building_id: i32,
    pub name: &'a str,
    pub row_label: &'a str,
    pub area: f64,
    pub status: &'a str,
    pub tags: JsonValue,
    pub comment: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::electric_shields)]
pub struct NewElectricShield<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::electricity_meters)]
pub struct NewElectricityMeter<'a> {
    pub meter_number: &'a str,
    pub serial_number: &'a str,
    pub location: &'a str,
    pub last_verified_hours_ago: Option<i32>,
    pub comment: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::meter_pavilions)]
pub struct NewMeterPavilion {
    pub meter_id: i32,
    pub pavilion_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::electricity_readings)]
pub struct NewElectricityReading<'a> {
    pub meter_id: i32,
    pub date: NaiveDate,
    pub meter_reading: f64,
    pub consumption: f64,
    pub comment: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            PavilionStatus::Free,
            PavilionStatus::Rented,
            PavilionStatus::Reserved,
            PavilionStatus::Repair,
        ] {
            assert_eq!(PavilionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(PavilionStatus::from_str("demolished"), None);
    }

    #[test]
    fn test_meter_staleness() {
        let mut meter = ElectricityMeter {
            id: 1,
            meter_number: "M-1".to_string(),
            serial_number: String::new(),
            location: String::new(),
            last_verified_hours_ago: None,
            electric_shield_id: None,
            comment: String::new(),
            created_at: chrono::NaiveDateTime::default(),
            updated_at: chrono::NaiveDateTime::default(),
        };

        // Never reported
        assert!(meter.is_stale());

        meter.last_verified_hours_ago = Some(12);
        assert!(!meter.is_stale());

        meter.last_verified_hours_ago = Some(STALE_VERIFICATION_HOURS + 1);
        assert!(meter.is_stale());
    }
}
