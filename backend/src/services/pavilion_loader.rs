//! Bulk load of the pavilion registry from the "все павильоны 1с" export.
//!
//! This is the only place pavilions are created; the reconcilers assume the
//! registry already exists and only update rows. Existing pavilions are left
//! untouched, so the load can be re-run safely.

use log::info;

use crate::models::PavilionStatus;
use crate::store::Store;

use super::workbook::Workbook;

pub const PAVILIONS_SHEET_NAME: &str = "все павильоны 1с";
pub const DEFAULT_BUILDING_NAME: &str = "Основной рынок";
pub const DEFAULT_PAVILION_AREA: f64 = 45.0;

const OBJECT_COLUMN: &str = "Объект";

/// Loads pavilion names from the export into the default building.
/// Returns (rows seen, pavilions created).
pub fn load_pavilions(store: &mut dyn Store, bytes: Vec<u8>) -> Result<(usize, usize), String> {
    let mut workbook = Workbook::from_bytes(bytes)?;
    let sheet = workbook.sheet(PAVILIONS_SHEET_NAME)?;

    if !sheet.missing_columns(&[OBJECT_COLUMN]).is_empty() {
        return Err(format!("Колонка '{}' не найдена", OBJECT_COLUMN));
    }

    let building = store
        .get_or_create_building(DEFAULT_BUILDING_NAME)
        .map_err(|e| e.to_string())?;

    let mut total = 0;
    let mut created = 0;

    store.begin_transaction().map_err(|e| e.to_string())?;
    for row in sheet.rows() {
        let name = row.get(OBJECT_COLUMN).trim();
        if name.is_empty() {
            continue;
        }
        total += 1;

        let exists = match store.pavilion_exists(building.id, name) {
            Ok(exists) => exists,
            Err(e) => {
                let _ = store.rollback_transaction();
                return Err(e.to_string());
            }
        };
        if exists {
            continue;
        }

        if let Err(e) = store.create_pavilion(
            building.id,
            name,
            DEFAULT_PAVILION_AREA,
            PavilionStatus::Free,
        ) {
            let _ = store.rollback_transaction();
            return Err(e.to_string());
        }
        created += 1;
    }
    store.commit_transaction().map_err(|e| e.to_string())?;

    info!("Pavilion load finished: {} rows, {} created", total, created);
    Ok((total, created))
}
