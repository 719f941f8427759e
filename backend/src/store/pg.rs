//! Postgres implementation of the [`Store`] capability, backed by diesel.

use chrono::NaiveDate;
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use crate::db::DbPool;
use crate::models::{
    Building, Contract, ElectricShield, ElectricityMeter, ElectricityReading, NewBuilding,
    NewContract, NewElectricShield, NewElectricityMeter, NewElectricityReading, NewMeterPavilion,
    NewPavilion, NewTenant, Pavilion, PavilionStatus, Tenant,
};
use crate::schema::{
    buildings, contracts, electric_shields, electricity_meters, electricity_readings,
    meter_pavilions, pavilions, tenants,
};
use crate::store::{Store, StoreError};

pub struct PgStore {
    conn: PooledConnection<ConnectionManager<PgConnection>>,
}

impl PgStore {
    pub fn from_pool(pool: &DbPool) -> Result<Self, StoreError> {
        let conn = pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl Store for PgStore {
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::begin_transaction(self.conn())
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    fn commit_transaction(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::commit_transaction(self.conn())
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::rollback_transaction(self.conn())
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    fn get_building(&mut self, id: i32) -> Result<Option<Building>, StoreError> {
        Ok(buildings::table
            .filter(buildings::id.eq(id))
            .select(Building::as_select())
            .first(self.conn())
            .optional()?)
    }

    fn get_or_create_building(&mut self, name: &str) -> Result<Building, StoreError> {
        let existing = buildings::table
            .filter(buildings::name.eq(name))
            .select(Building::as_select())
            .first(self.conn())
            .optional()?;

        if let Some(building) = existing {
            return Ok(building);
        }

        Ok(diesel::insert_into(buildings::table)
            .values(&NewBuilding { name, address: "" })
            .returning(Building::as_returning())
            .get_result(self.conn())?)
    }

    fn find_pavilion_by_name(
        &mut self,
        name: &str,
        building_id: Option<i32>,
    ) -> Result<Option<Pavilion>, StoreError> {
        let mut query = pavilions::table
            .filter(pavilions::name.eq(name))
            .into_boxed();

        if let Some(building_id) = building_id {
            query = query.filter(pavilions::building_id.eq(building_id));
        }

        Ok(query
            .order(pavilions::id.asc())
            .select(Pavilion::as_select())
            .first(self.conn())
            .optional()?)
    }

    fn pavilion_exists(&mut self, building_id: i32, name: &str) -> Result<bool, StoreError> {
        use diesel::dsl::{exists, select};

        Ok(select(exists(
            pavilions::table
                .filter(pavilions::building_id.eq(building_id))
                .filter(pavilions::name.eq(name)),
        ))
        .get_result(self.conn())?)
    }

    fn create_pavilion(
        &mut self,
        building_id: i32,
        name: &str,
        area: f64,
        status: PavilionStatus,
    ) -> Result<Pavilion, StoreError> {
        Ok(diesel::insert_into(pavilions::table)
            .values(&NewPavilion {
                building_id,
                name,
                row_label: "",
                area,
                status: status.as_str(),
                tags: serde_json::json!([]),
                comment: "",
            })
            .returning(Pavilion::as_returning())
            .get_result(self.conn())?)
    }

    fn update_pavilion_occupancy(
        &mut self,
        pavilion_id: i32,
        building_id: i32,
        tenant_id: i32,
        contract_id: i32,
        status: PavilionStatus,
    ) -> Result<(), StoreError> {
        diesel::update(pavilions::table.filter(pavilions::id.eq(pavilion_id)))
            .set((
                pavilions::building_id.eq(building_id),
                pavilions::tenant_id.eq(Some(tenant_id)),
                pavilions::contract_id.eq(Some(contract_id)),
                pavilions::status.eq(status.as_str()),
                pavilions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(self.conn())?;
        Ok(())
    }

    fn get_or_create_tenant(
        &mut self,
        name: &str,
        inn: &str,
    ) -> Result<(Tenant, bool), StoreError> {
        let existing = tenants::table
            .filter(tenants::name.eq(name))
            .order(tenants::id.asc())
            .select(Tenant::as_select())
            .first(self.conn())
            .optional()?;

        if let Some(tenant) = existing {
            return Ok((tenant, false));
        }

        let tenant = diesel::insert_into(tenants::table)
            .values(&NewTenant {
                name,
                inn,
                phone: "",
                email: "",
            })
            .returning(Tenant::as_returning())
            .get_result(self.conn())?;
        Ok((tenant, true))
    }

    fn update_tenant_inn(&mut self, tenant_id: i32, inn: &str) -> Result<(), StoreError> {
        diesel::update(tenants::table.filter(tenants::id.eq(tenant_id)))
            .set(tenants::inn.eq(inn))
            .execute(self.conn())?;
        Ok(())
    }

    fn get_or_create_contract(&mut self, name: &str) -> Result<(Contract, bool), StoreError> {
        let existing = contracts::table
            .filter(contracts::name.eq(name))
            .order(contracts::id.asc())
            .select(Contract::as_select())
            .first(self.conn())
            .optional()?;

        if let Some(contract) = existing {
            return Ok((contract, false));
        }

        let contract = diesel::insert_into(contracts::table)
            .values(&NewContract { name })
            .returning(Contract::as_returning())
            .get_result(self.conn())?;
        Ok((contract, true))
    }

    fn get_or_create_shield(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<(ElectricShield, bool), StoreError> {
        let existing = electric_shields::table
            .filter(electric_shields::name.eq(name))
            .select(ElectricShield::as_select())
            .first(self.conn())
            .optional()?;

        if let Some(shield) = existing {
            return Ok((shield, false));
        }

        let shield = diesel::insert_into(electric_shields::table)
            .values(&NewElectricShield { name, description })
            .returning(ElectricShield::as_returning())
            .get_result(self.conn())?;
        Ok((shield, true))
    }

    fn find_meter_by_number(
        &mut self,
        meter_number: &str,
    ) -> Result<Option<ElectricityMeter>, StoreError> {
        Ok(electricity_meters::table
            .filter(electricity_meters::meter_number.eq(meter_number))
            .select(ElectricityMeter::as_select())
            .first(self.conn())
            .optional()?)
    }

    fn create_meter(
        &mut self,
        meter_number: &str,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<ElectricityMeter, StoreError> {
        Ok(diesel::insert_into(electricity_meters::table)
            .values(&NewElectricityMeter {
                meter_number,
                serial_number,
                location,
                last_verified_hours_ago,
                comment: "",
            })
            .returning(ElectricityMeter::as_returning())
            .get_result(self.conn())?)
    }

    fn update_meter(
        &mut self,
        meter_id: i32,
        serial_number: &str,
        location: &str,
        last_verified_hours_ago: Option<i32>,
    ) -> Result<(), StoreError> {
        diesel::update(electricity_meters::table.filter(electricity_meters::id.eq(meter_id)))
            .set((
                electricity_meters::serial_number.eq(serial_number),
                electricity_meters::location.eq(location),
                electricity_meters::last_verified_hours_ago.eq(last_verified_hours_ago),
                electricity_meters::updated_at.eq(diesel::dsl::now),
            ))
            .execute(self.conn())?;
        Ok(())
    }

    fn set_meter_pavilions(
        &mut self,
        meter_id: i32,
        pavilion_ids: &[i32],
    ) -> Result<(), StoreError> {
        diesel::delete(meter_pavilions::table.filter(meter_pavilions::meter_id.eq(meter_id)))
            .execute(self.conn())?;

        let links: Vec<NewMeterPavilion> = pavilion_ids
            .iter()
            .map(|&pavilion_id| NewMeterPavilion {
                meter_id,
                pavilion_id,
            })
            .collect();

        diesel::insert_into(meter_pavilions::table)
            .values(&links)
            .execute(self.conn())?;
        Ok(())
    }

    fn set_meter_shield(&mut self, meter_id: i32, shield_id: i32) -> Result<(), StoreError> {
        diesel::update(electricity_meters::table.filter(electricity_meters::id.eq(meter_id)))
            .set((
                electricity_meters::electric_shield_id.eq(Some(shield_id)),
                electricity_meters::updated_at.eq(diesel::dsl::now),
            ))
            .execute(self.conn())?;
        Ok(())
    }

    fn reading_exists(&mut self, meter_id: i32, date: NaiveDate) -> Result<bool, StoreError> {
        use diesel::dsl::{exists, select};

        Ok(select(exists(
            electricity_readings::table
                .filter(electricity_readings::meter_id.eq(meter_id))
                .filter(electricity_readings::date.eq(date)),
        ))
        .get_result(self.conn())?)
    }

    fn latest_reading_before(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
    ) -> Result<Option<ElectricityReading>, StoreError> {
        Ok(electricity_readings::table
            .filter(electricity_readings::meter_id.eq(meter_id))
            .filter(electricity_readings::date.lt(date))
            .order(electricity_readings::date.desc())
            .select(ElectricityReading::as_select())
            .first(self.conn())
            .optional()?)
    }

    fn create_reading(
        &mut self,
        meter_id: i32,
        date: NaiveDate,
        meter_reading: f64,
        consumption: f64,
    ) -> Result<ElectricityReading, StoreError> {
        Ok(diesel::insert_into(electricity_readings::table)
            .values(&NewElectricityReading {
                meter_id,
                date,
                meter_reading,
                consumption,
                comment: "",
            })
            .returning(ElectricityReading::as_returning())
            .get_result(self.conn())?)
    }
}
