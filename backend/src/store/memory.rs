//! In-memory implementation of the [`Store`] capability.
//!
//! Used by the unit tests as a stand-in for Postgres. The transaction
//! semantics mirror the real store's all-or-nothing contract: `begin`
//! snapshots the whole state, `rollback` restores it, `commit` drops it.

use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::models::{
    Building, Contract, ElectricShield, ElectricityMeter, ElectricityReading, Pavilion,
    PavilionStatus, Tenant,
};
use crate::store::{Store, StoreError};

#[derive(Default, Clone)]
struct State {
    buildings: Vec<Building>,
    tenants: Vec<Tenant>,
    contracts: Vec<Contract>,
    pavilions: Vec<Pavilion>,
    shields: Vec<ElectricShield>,
    meters: Vec<ElectricityMeter>,
    meter_pavilions: Vec<(i32, i32)>,
    readings: Vec<ElectricityReading>,
    next_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    state: State,
    snapshot: Option<State>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i32 {
        self.state.next_id += 1;
        self.state.next_id
    }

    // --- test fixtures and inspection helpers ---

    pub fn insert_building(&mut self, name: &str) -> Building {
        let building = Building {
            id: self.next_id(),
            name: name.to_string(),
            address: String::new(),
            created_at: now(),
        };
        self.state.buildings.push(building.clone());
        building
    }

    pub fn insert_pavilion(&mut self, building_id: i32, name: &str) -> Pavilion {
        let pavilion = Pavilion {
            id: self.next_id(),
            building_id,
            name: name.to_string(),
            row_label: String::new(),
            area: 45.0,
            status: PavilionStatus::Free.as_str().to_string(),
            tenant_id: None,
            contract_id: None,
            tags: serde_json::json!([]),
            comment: String::new(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.pavilions.push(pavilion.clone());
        pavilion
    }

    pub fn pavilion(&self, id: i32) -> Option<&Pavilion> {
        self.state.pavilions.iter().find(|p| p.id == id)
    }

    pub fn meters(&self) -> &[ElectricityMeter] {
        &self.state.meters
    }

    pub fn readings(&self) -> &[ElectricityReading] {
        &self.state.readings
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.state.tenants
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.state.contracts
    }

    pub fn shields(&self) -> &[ElectricShield] {
        &self.state.shields
    }

    pub fn buildings(&self) -> &[Building] {
        &self.state.buildings
    }

    pub fn pavilion_ids_for_meter(&self, meter_id: i32) -> Vec<i32> {
        self.state
            .meter_pavilions
            .iter()
            .filter(|(m, _)| *m == meter_id)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl Store for MemoryStore {
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction(
                "transaction already in progress".to_string(),
            ));
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), StoreError> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("no transaction in progress".to_string()))
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreError> {
        match self.snapshot.take() {
            Some(snapshot) => {
                self.state = snapshot;
                Ok(())
            }
            None => Err(StoreError::Transaction(
                "no transaction in progress".to_string(),
            )),
        }
    }

    fn get_building(&mut self, id: i32) -> Result<Option<Building>, StoreError> {
        Ok(self.state.buildings.iter().find(|b| b.id == id).cloned())
    }

    fn get_or_create_building(&mut self, name: &str) -> Result<Building, StoreError> {
        if let Some(building) = self.state.buildings.iter().find(|b| b.name == name) {
            return Ok(building.clone());
        }
        Ok(self.insert_building(name))
    }

    fn find_pavilion_by_name(
        &mut self,
        name: &str,
        building_id: Option<i32>,
    ) -> Result<Option<Pavilion>, StoreError> {
        Ok(self
            .state
            .pavilions
            .iter()
            .find(|p| p.name == name && building_id.is_none_or(|b| p.building_id == b))
            .cloned())
    }

    fn pavilion_exists(&mut self, building_id: i32, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .pavilions
            .iter()
            .any(|p| p.building_id == building_id && p.name == name))
    }

    fn create_pavilion(
        &mut self,
        building_id: i32,
        name: &str,
        area: f64,
        status: PavilionStatus,
    ) -> Result<Pavilion, StoreError> {
        let mut pavilion = self.insert_pavilion(building_id, name);
        pavilion.area = area;
        pavilion.status = status.as_str().to_string();
        let id = pavilion.id;
        if let Some(stored) = self.state.pavilions.iter_mut().find(|p| p.id == id) {
            stored.area = area;
            stored.status = status.as_str().to_string();
        }
        Ok(pavilion)
    }

    fn update_pavilion_occupancy(
        &mut self,
        pavilion_id: i32,
        building_id: i32,
        tenant_id: i32,
        contract_id: i32,
        status: PavilionStatus,
    ) -> Result<(), StoreError> {
        if let Some(pavilion) = self.state.pavilions.iter_mut().find(|p| p.id == pavilion_id) {
            pavilion.building_id = building_id;
            pavilion.tenant_id = Some(tenant_id);
            pavilion.contract_id = Some(contract_id);
            pavilion.status = status.as_str().to_string();
            pavilion.updated_at = now();
        }
        Ok(())
    }

    fn get_or_create_tenant(
        &mut self,
        name: &str,
        inn: &str,
    ) -> Result<(Tenant, bool), StoreError> {
        if let Some(tenant) = self.state.tenants.iter().find(|t| t.name == name) {
            return Ok((tenant.clone(), false));
        }
        let tenant = Tenant {
            id: self.next_id(),
            name: name.to_string(),
            inn: inn.to_string(),
            phone: String::new(),
            email: String::new(),
            created_at: now(),
        };
        self.state.tenants.push(tenant.clone());
        Ok((tenant, true))
    }

    fn update_tenant_inn(&mut self, tenant_id: i32, inn: &str) -> Result<(), StoreError> {
        if let Some(tenant) = self.state.tenants.iter_mut().find(|t| t.id == tenant_id) {
            tenant.inn = inn.to_string();
        }
        Ok(())
    }

    fn get_or_create_contract(&mut self, name: &str) -> Result<(Contract, bool), StoreError> {
        if let Some(contract) = self.state.contracts.iter().find(|c| c.name == name) {
            return Ok((contract.clone(), false));
        }
        let contract = Contract {
            id: self.next_id(),
            name: name.to_string(),
            contract_file: None,
            created_at: now(),
        };
        self.state.contracts.push(contract.clone());
        Ok((contract, true))
    }

    fn get_or_create_shield(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<(ElectricShield, bool), StoreError> {
        if let Some(shield) = self.state.shields.iter().find(|s| s.name == name) {
            return Ok((shield.clone(), false));
        }
        let shield = ElectricShield {
            id: self.next_id(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now(),
        };
        self.state.shields.push(shield.clone());
        Ok((shield, true))
    }

    fn find_meter_by_number(
        &mut self,
        meter_number: &str,
    ) -> Result<Option<ElectricityMeter>, StoreError> {
        Ok(self
            .state
            .meters
            .iter()
            .find(|m| m.meter_number == meter_number)
            .cloned())
    }

    fn create_meter(
        &mut self,
        meter_number: &str,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<ElectricityMeter, StoreError> {
        let meter = ElectricityMeter {
            id: self.next_id(),
            meter_number: meter_number.to_string(),
            serial_number: serial_number.to_string(),
            location: location.to_string(),
            last_verified_hours_ago,
            electric_shield_id: None,
            comment: String::new(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.meters.push(meter.clone());
        Ok(meter)
    }

    fn update_meter(
        &mut self,
        meter_id: i32,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<(), StoreError> {
        if let Some(meter) = self.state.meters.iter_mut().find(|m| m.id == meter_id) {
            meter.serial_number = serial_number.to_string();
            meter.location = location.to_string();
            meter.last_verified_hours_ago = last_verified_hours_ago;
            meter.updated_at = now();
        }
        Ok(())
    }

    fn set_meter_pavilions(
        &mut self,
        meter_id: i32,
        pavilion_ids: &[i32],
    ) -> Result<(), StoreError> {
        self.state.meter_pavilions.retain(|(m, _)| *m != meter_id);
        for &pavilion_id in pavilion_ids {
            self.state.meter_pavilions.push((meter_id, pavilion_id));
        }
        Ok(())
    }

    fn set_meter_shield(&mut self, meter_id: i32, shield_id: i32) -> Result<(), StoreError> {
        if let Some(meter) = self.state.meters.iter_mut().find(|m| m.id == meter_id) {
            meter.electric_shield_id = Some(shield_id);
            meter.updated_at = now();
        }
        Ok(())
    }

    fn reading_exists(&mut self, meter_id: i32, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .state
            .readings
            .iter()
            .any(|r| r.meter_id == meter_id && r.date == date))
    }

    fn latest_reading_before(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
    ) -> Result<Option<ElectricityReading>, StoreError> {
        Ok(self
            .state
            .readings
            .iter()
            .filter(|r| r.meter_id == meter_id && r.date < date)
            .max_by_key(|r| r.date)
            .cloned())
    }

    fn create_reading(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
        meter_reading: f64,
        consumption: f64,
    ) -> Result<ElectricityReading, StoreError> {
        let reading = ElectricityReading {
            id: self.next_id(),
            meter_id,
            date,
            meter_reading,
            consumption,
            comment: String::new(),
            created_at: now(),
        };
        self.state.readings.push(reading.clone());
        Ok(reading)
    }
}
