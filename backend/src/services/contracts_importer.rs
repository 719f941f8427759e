//! Import of tenants and rental contracts from the "актуальные арендаторы"
//! roster sheet.
//!
//! Each row names a counterparty, its tax id, a contract and the rented
//! object(s). The owning building is inferred from the contract code (see
//! [`super::building_rules`]); pavilions are resolved first inside that
//! building and then anywhere as a fallback, which flags cross-building
//! moves. Links are rewritten only when something actually changed, so
//! re-importing the same roster is a no-op.

use std::collections::HashSet;

use log::{error, info, warn};
use serde::Serialize;

use crate::models::{Building, Pavilion, PavilionStatus};
use crate::store::{Store, StoreError};

use super::building_rules::{BuildingMatch, BuildingRules};
use super::pavilion_names::expand_location_to_pavilion_names;
use super::pavilion_resolver::name_candidates;
use super::workbook::{Sheet, Workbook};
use super::ImportReport;

/// The roster lives on exactly one sheet with this name
/// (matched case- and whitespace-insensitively).
pub const ROSTER_SHEET_NAME: &str = "актуальные арендаторы";

const REQUIRED_COLUMNS: [&str; 4] = ["Контрагент", "ИНН", "Договор", "Объект"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractImportStats {
    pub tenants_created: usize,
    pub tenants_updated: usize,
    pub contracts_created: usize,
    pub pavilions_updated: usize,
    pub unmatched_pavilions: Vec<String>,
}

/// One roster row, all fields as raw text.
#[derive(Debug, Clone, Default)]
pub struct RosterRow {
    pub tenant_name: String,
    pub inn: String,
    pub contract_name: String,
    pub location: String,
}

pub struct ContractsImporter<'a> {
    store: &'a mut dyn Store,
    rules: BuildingRules,
    errors: Vec<String>,
    stats: ContractImportStats,
}

impl<'a> ContractsImporter<'a> {
    pub fn new(store: &'a mut dyn Store, rules: BuildingRules) -> Self {
        Self {
            store,
            rules,
            errors: Vec::new(),
            stats: ContractImportStats::default(),
        }
    }

    /// Runs the import over the uploaded xlsx bytes. All row mutations share
    /// one transaction; a store fault rolls everything back.
    pub fn import(&mut self, bytes: Vec<u8>) -> bool {
        let mut workbook = match Workbook::from_bytes(bytes) {
            Ok(workbook) => workbook,
            Err(e) => {
                error!("Roster import failed to open workbook: {}", e);
                self.errors.push(format!("Ошибка при обработке файла: {}", e));
                return false;
            }
        };

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            match workbook.sheet(&name) {
                Ok(sheet) => sheets.push((name, sheet)),
                Err(e) => {
                    self.errors.push(format!("Ошибка при обработке файла: {}", e));
                    return false;
                }
            }
        }

        self.import_sheets(sheets)
    }

    /// Finds the roster sheet and reconciles its rows. Separated from the
    /// byte decoding so the sheet-level rules run against constructed
    /// sheets too.
    fn import_sheets(&mut self, sheets: Vec<(String, Sheet)>) -> bool {
        let sheet = match sheets
            .iter()
            .find(|(name, _)| name.trim().to_lowercase() == ROSTER_SHEET_NAME)
            .map(|(_, sheet)| sheet)
        {
            Some(sheet) => sheet,
            None => {
                self.errors
                    .push(format!("Лист \"{}\" не найден.", ROSTER_SHEET_NAME));
                return false;
            }
        };

        let missing = sheet.missing_columns(&REQUIRED_COLUMNS);
        if !missing.is_empty() {
            self.errors
                .push(format!("Отсутствуют колонки: {}", missing.join(", ")));
            return false;
        }

        if let Err(e) = self.store.begin_transaction() {
            self.errors.push(format!("Ошибка при обработке файла: {}", e));
            return false;
        }

        for row in sheet.rows() {
            let roster_row = RosterRow {
                tenant_name: row.get("Контрагент").trim().to_string(),
                inn: row.get("ИНН").trim().to_string(),
                contract_name: row.get("Договор").trim().to_string(),
                location: row.get("Объект").trim().to_string(),
            };

            if let Err(e) = self.process_row(&roster_row) {
                error!("Store fault during roster import: {}", e);
                if let Err(rollback_err) = self.store.rollback_transaction() {
                    error!("Rollback failed: {}", rollback_err);
                }
                self.errors.push(format!("Ошибка при обработке файла: {}", e));
                return false;
            }
        }

        if let Err(e) = self.store.commit_transaction() {
            self.errors.push(format!("Ошибка при обработке файла: {}", e));
            return false;
        }

        info!(
            "Roster import finished: {} tenants created, {} updated, {} contracts, {} pavilions relinked",
            self.stats.tenants_created,
            self.stats.tenants_updated,
            self.stats.contracts_created,
            self.stats.pavilions_updated
        );
        true
    }

    /// Reconciles one roster row. Business problems are recorded and
    /// swallowed; only store faults propagate.
    pub fn process_row(&mut self, row: &RosterRow) -> Result<(), StoreError> {
        if row.tenant_name.is_empty() || row.contract_name.is_empty() || row.location.is_empty() {
            return Ok(());
        }

        let building = self.derive_building(&row.contract_name)?;
        let pavilions = self.resolve_pavilions(&row.location, &building, &row.contract_name)?;

        // Without a single resolved pavilion the row creates nothing
        if pavilions.is_empty() {
            return Ok(());
        }

        let (tenant, tenant_created) = self
            .store
            .get_or_create_tenant(&row.tenant_name, &row.inn)?;
        if tenant_created {
            self.stats.tenants_created += 1;
        } else if !row.inn.is_empty() && tenant.inn != row.inn {
            self.store.update_tenant_inn(tenant.id, &row.inn)?;
            self.stats.tenants_updated += 1;
        }

        let (contract, contract_created) =
            self.store.get_or_create_contract(&row.contract_name)?;
        if contract_created {
            self.stats.contracts_created += 1;
        }

        for pavilion in &pavilions {
            let unchanged = pavilion.building_id == building.id
                && pavilion.tenant_id == Some(tenant.id)
                && pavilion.contract_id == Some(contract.id)
                && pavilion.status == PavilionStatus::Rented.as_str();
            if unchanged {
                continue;
            }

            self.store.update_pavilion_occupancy(
                pavilion.id,
                building.id,
                tenant.id,
                contract.id,
                PavilionStatus::Rented,
            )?;
            self.stats.pavilions_updated += 1;
        }

        Ok(())
    }

    /// Derives the owning building from the contract code and materializes it.
    fn derive_building(&mut self, contract_name: &str) -> Result<Building, StoreError> {
        let derived = self.rules.building_for_contract(contract_name);
        if let BuildingMatch::UnknownCode { code, building } = &derived {
            warn!(
                "Unknown building code '{}' in contract '{}'",
                code, contract_name
            );
            self.errors.push(format!(
                "Неизвестный код здания '{}' в договоре '{}', используется '{}'",
                code, contract_name, building
            ));
        }
        self.store.get_or_create_building(derived.building_name())
    }

    /// Resolves the row's pavilion names, first scoped to the derived
    /// building, then anywhere. A pavilion found only outside the building
    /// is accepted with a cross-building move warning; a name found nowhere
    /// joins the unmatched list.
    fn resolve_pavilions(
        &mut self,
        location: &str,
        building: &Building,
        contract_name: &str,
    ) -> Result<Vec<Pavilion>, StoreError> {
        let names = expand_location_to_pavilion_names(location);
        let mut resolved = Vec::new();
        let mut seen_ids = HashSet::new();

        for name in &names {
            if name.is_empty() {
                continue;
            }

            let candidates = name_candidates(name);
            let mut hit = None;
            for candidate in &candidates {
                if let Some(pavilion) = self
                    .store
                    .find_pavilion_by_name(candidate, Some(building.id))?
                {
                    hit = Some(pavilion);
                    break;
                }
            }
            if hit.is_none() {
                for candidate in &candidates {
                    if let Some(pavilion) = self.store.find_pavilion_by_name(candidate, None)? {
                        if pavilion.building_id != building.id {
                            let old_building = self
                                .store
                                .get_building(pavilion.building_id)?
                                .map(|b| b.name)
                                .unwrap_or_default();
                            self.errors.push(format!(
                                "Павильон '{}' числится в здании '{}', по договору '{}' переносится в '{}'",
                                pavilion.name, old_building, contract_name, building.name
                            ));
                        }
                        hit = Some(pavilion);
                        break;
                    }
                }
            }

            match hit {
                Some(pavilion) => {
                    if seen_ids.insert(pavilion.id) {
                        resolved.push(pavilion);
                    }
                }
                None => {
                    if !self.stats.unmatched_pavilions.contains(name) {
                        self.stats.unmatched_pavilions.push(name.clone());
                    }
                }
            }
        }

        Ok(resolved)
    }

    pub fn report(&self) -> ImportReport<ContractImportStats> {
        ImportReport {
            success: self.errors.is_empty(),
            unmatched_count: self.stats.unmatched_pavilions.len(),
            stats: self.stats.clone(),
            errors: self.errors.clone(),
            error_report_path: None,
            error_report_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn row(tenant: &str, inn: &str, contract: &str, location: &str) -> RosterRow {
        RosterRow {
            tenant_name: tenant.to_string(),
            inn: inn.to_string(),
            contract_name: contract.to_string(),
            location: location.to_string(),
        }
    }

    fn store_with_main_building(pavilions: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        let building = store.insert_building("Основной рынок");
        for name in pavilions {
            store.insert_pavilion(building.id, name);
        }
        store
    }

    #[test]
    fn test_links_tenant_and_contract_to_pavilion() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ООО Ромашка", "7701234567", "Договор №1", "Е10/1"))
            .unwrap();

        assert_eq!(importer.stats.tenants_created, 1);
        assert_eq!(importer.stats.contracts_created, 1);
        assert_eq!(importer.stats.pavilions_updated, 1);
        drop(importer);

        let tenant = store.tenants().first().unwrap().clone();
        assert_eq!(tenant.inn, "7701234567");
        let pavilion = store.find_pavilion_by_name("Е10/1", None).unwrap().unwrap();
        assert_eq!(pavilion.tenant_id, Some(tenant.id));
        assert_eq!(pavilion.status, "rented");
    }

    #[test]
    fn test_second_identical_import_is_a_no_op() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());
        let roster = row("ООО Ромашка", "7701234567", "Договор №1", "Е10/1");

        importer.process_row(&roster).unwrap();
        assert_eq!(importer.stats.pavilions_updated, 1);

        importer.process_row(&roster).unwrap();
        assert_eq!(importer.stats.pavilions_updated, 1);
        assert_eq!(importer.stats.tenants_created, 1);
        assert_eq!(importer.stats.tenants_updated, 0);
        assert_eq!(importer.stats.contracts_created, 1);
    }

    #[test]
    fn test_changed_inn_updates_tenant() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ООО Ромашка", "111", "Договор №1", "Е10/1"))
            .unwrap();
        importer
            .process_row(&row("ООО Ромашка", "222", "Договор №1", "Е10/1"))
            .unwrap();

        assert_eq!(importer.stats.tenants_updated, 1);
        drop(importer);
        assert_eq!(store.tenants()[0].inn, "222");
    }

    #[test]
    fn test_known_code_routes_to_mapped_building() {
        let mut store = MemoryStore::new();
        store.insert_building("Основной рынок");
        let central = store.insert_building("Центральный рынок");
        let pavilion = store.insert_pavilion(central.id, "Г9/1");

        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());
        importer
            .process_row(&row("ИП Иванов", "123", "Договор №ЦР-5", "Г9/1"))
            .unwrap();

        assert_eq!(importer.stats.pavilions_updated, 1);
        assert!(importer.errors.is_empty());
        drop(importer);
        assert_eq!(store.pavilion(pavilion.id).unwrap().building_id, central.id);
    }

    #[test]
    fn test_unknown_code_falls_back_with_warning() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ИП Иванов", "123", "Договор №ЮР-5", "Е10/1"))
            .unwrap();

        assert_eq!(importer.stats.pavilions_updated, 1);
        assert_eq!(importer.errors.len(), 1);
        assert!(importer.errors[0].contains("ЮР"));
    }

    #[test]
    fn test_contract_without_code_falls_back_silently() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ИП Иванов", "123", "Договор аренды", "Е10/1"))
            .unwrap();

        assert_eq!(importer.stats.pavilions_updated, 1);
        assert!(importer.errors.is_empty());
    }

    #[test]
    fn test_cross_building_move_is_warned_but_accepted() {
        let mut store = MemoryStore::new();
        store.insert_building("Основной рынок");
        let eastern = store.insert_building("Восточный рынок");
        let pavilion = store.insert_pavilion(eastern.id, "Е10/1");

        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());
        // Contract carries no code, so the derived building is the default
        importer
            .process_row(&row("ИП Иванов", "123", "Договор №7", "Е10/1"))
            .unwrap();

        assert_eq!(importer.stats.pavilions_updated, 1);
        assert_eq!(importer.errors.len(), 1);
        assert!(importer.errors[0].contains("Восточный рынок"));
        assert!(importer.errors[0].contains("Договор №7"));
        drop(importer);

        let moved = store.pavilion(pavilion.id).unwrap();
        assert_eq!(moved.building_id, store.buildings()[0].id);
    }

    #[test]
    fn test_row_without_resolved_pavilions_creates_nothing() {
        let mut store = store_with_main_building(&[]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ООО Ромашка", "111", "Договор №1", "Х99/9"))
            .unwrap();
        importer
            .process_row(&row("ООО Лютик", "222", "Договор №2", "Х99/9"))
            .unwrap();

        assert_eq!(importer.stats.tenants_created, 0);
        assert_eq!(importer.stats.contracts_created, 0);
        assert_eq!(
            importer.stats.unmatched_pavilions,
            vec!["Х99/9".to_string()]
        );
        drop(importer);
        assert!(store.tenants().is_empty());
        assert!(store.contracts().is_empty());
    }

    #[test]
    fn test_empty_required_fields_skip_row() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer.process_row(&row("", "1", "Договор №1", "Е10/1")).unwrap();
        importer.process_row(&row("ООО", "1", "", "Е10/1")).unwrap();
        importer.process_row(&row("ООО", "1", "Договор №1", "")).unwrap();

        assert_eq!(importer.stats.tenants_created, 0);
        assert_eq!(importer.stats.pavilions_updated, 0);
    }

    #[test]
    fn test_multi_pavilion_location_links_all() {
        let mut store = store_with_main_building(&["Е10/1", "Е10/2"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        importer
            .process_row(&row("ООО Ромашка", "111", "Договор №1", "Е10/1,2"))
            .unwrap();

        assert_eq!(importer.stats.pavilions_updated, 2);
    }

    fn roster_sheet(rows: Vec<Vec<String>>) -> Sheet {
        Sheet::new(
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        )
    }

    #[test]
    fn test_roster_sheet_matched_case_and_whitespace_insensitively() {
        let mut store = store_with_main_building(&["Е10/1"]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        let sheet = roster_sheet(vec![vec![
            "ООО Ромашка".to_string(),
            "111".to_string(),
            "Договор №1".to_string(),
            "Е10/1".to_string(),
        ]]);
        let ok = importer.import_sheets(vec![(" Актуальные Арендаторы ".to_string(), sheet)]);

        assert!(ok);
        assert!(importer.errors.is_empty());
        assert_eq!(importer.stats.tenants_created, 1);
        assert_eq!(importer.stats.pavilions_updated, 1);
    }

    #[test]
    fn test_missing_roster_sheet_is_fatal() {
        let mut store = store_with_main_building(&[]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        let other = Sheet::new(vec!["Объект".to_string()], vec![]);
        assert!(!importer.import_sheets(vec![("прочее".to_string(), other)]));
        assert!(importer.errors[0].contains(ROSTER_SHEET_NAME));
        assert!(!importer.report().success);
    }

    #[test]
    fn test_missing_columns_are_fatal() {
        let mut store = store_with_main_building(&[]);
        let mut importer = ContractsImporter::new(&mut store, BuildingRules::default());

        let sheet = Sheet::new(vec!["Контрагент".to_string()], vec![]);
        assert!(!importer.import_sheets(vec![(ROSTER_SHEET_NAME.to_string(), sheet)]));
        assert!(importer.errors[0].contains("Отсутствуют колонки"));
        assert!(importer.errors[0].contains("ИНН"));
    }
}
