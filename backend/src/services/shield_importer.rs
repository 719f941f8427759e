//! Import of electric-shield assignments: which shield each meter hangs on.
//!
//! The source sheet has two columns, meter number and shield name. Shields
//! are created lazily by name; meters unknown to the system are skipped.

use log::{info, warn};
use serde::Serialize;

use crate::store::{Store, StoreError};

use super::workbook::Workbook;

/// Shield column value meaning "this meter hangs on no shield".
pub const NO_SHIELD_MARKER: &str = "NO BOX";

const METER_COLUMN: &str = "№ счетчика";
const SHIELD_COLUMN: &str = "Щиток";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShieldImportStats {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub shields_created: usize,
}

pub struct ShieldImporter<'a> {
    store: &'a mut dyn Store,
    errors: Vec<String>,
    stats: ShieldImportStats,
}

impl<'a> ShieldImporter<'a> {
    pub fn new(store: &'a mut dyn Store) -> Self {
        Self {
            store,
            errors: Vec::new(),
            stats: ShieldImportStats::default(),
        }
    }

    /// Runs the import over the given sheet. One transaction for all rows.
    pub fn import(&mut self, bytes: Vec<u8>, sheet_name: &str) -> bool {
        let mut workbook = match Workbook::from_bytes(bytes) {
            Ok(workbook) => workbook,
            Err(e) => {
                self.errors.push(e);
                return false;
            }
        };

        let sheet = match workbook.sheet(sheet_name) {
            Ok(sheet) => sheet,
            Err(e) => {
                self.errors.push(e);
                return false;
            }
        };

        let missing = sheet.missing_columns(&[METER_COLUMN, SHIELD_COLUMN]);
        if !missing.is_empty() {
            self.errors
                .push(format!("Отсутствуют колонки: {}", missing.join(", ")));
            return false;
        }

        if let Err(e) = self.store.begin_transaction() {
            self.errors.push(e.to_string());
            return false;
        }

        for row in sheet.rows() {
            let meter_number = row.get(METER_COLUMN).trim().to_string();
            let shield_name = row.get(SHIELD_COLUMN).trim().to_string();

            if let Err(e) = self.process_row(&meter_number, &shield_name) {
                let _ = self.store.rollback_transaction();
                self.errors.push(e.to_string());
                return false;
            }
        }

        if let Err(e) = self.store.commit_transaction() {
            self.errors.push(e.to_string());
            return false;
        }

        info!(
            "Shield import finished: {} rows, {} meters updated, {} shields created, {} skipped",
            self.stats.total, self.stats.updated, self.stats.shields_created, self.stats.skipped
        );
        true
    }

    pub fn process_row(
        &mut self,
        meter_number: &str,
        shield_name: &str,
    ) -> Result<(), StoreError> {
        if meter_number.is_empty() || shield_name.is_empty() {
            return Ok(());
        }
        self.stats.total += 1;

        if shield_name.to_uppercase() == NO_SHIELD_MARKER {
            self.stats.skipped += 1;
            return Ok(());
        }

        let meter = match self.store.find_meter_by_number(meter_number)? {
            Some(meter) => meter,
            None => {
                warn!("Meter {} not found, shield assignment skipped", meter_number);
                self.stats.skipped += 1;
                return Ok(());
            }
        };

        let (shield, created) = self
            .store
            .get_or_create_shield(shield_name, "Импортирован из файла щитков")?;
        if created {
            self.stats.shields_created += 1;
        }

        self.store.set_meter_shield(meter.id, shield.id)?;
        self.stats.updated += 1;
        Ok(())
    }

    pub fn stats(&self) -> &ShieldImportStats {
        &self.stats
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
