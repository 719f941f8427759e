//! Import of electricity meters and readings from an uploaded Excel file.
//!
//! The file carries one sheet per reading date, named "показания <дата>".
//! Each row upserts a meter by its number, re-binds the meter's pavilion
//! links from the free-text location column, and records a dated reading
//! with the consumption delta against the previous reading.
//!
//! Row-level problems (unmatched pavilion, stale-communication marker,
//! unparseable reading) are recorded and the import continues; a store
//! fault rolls the whole sheet back.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde::Serialize;

use crate::store::{Store, StoreError};

use super::pavilion_names::expand_location_to_pavilion_names;
use super::pavilion_resolver::find_pavilions_by_names;
use super::workbook::{parse_date_label, Sheet, Workbook};
use super::ImportReport;

/// Reading sheets are recognized by this name prefix.
pub const READINGS_SHEET_PREFIX: &str = "показания";

/// Literal placed in the readings column when a meter stopped reporting.
pub const STALE_COMMUNICATION_MARKER: &str = "Не на связи больше 168 часов";

const REQUIRED_COLUMNS: [&str; 5] = [
    "№ счетчика",
    "Серийник",
    "Показания",
    "Расположение",
    "Проверено часов назад",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct MeterImportStats {
    pub sheets_processed: usize,
    pub meters_created: usize,
    pub meters_updated: usize,
    pub readings_created: usize,
    pub unmatched_pavilions: Vec<String>,
}

/// One data row of a readings sheet, all fields as raw text.
#[derive(Debug, Clone, Default)]
pub struct MeterRow {
    pub meter_number: String,
    pub serial_number: String,
    pub reading: String,
    pub location: String,
    pub hours_ago: String,
}

pub struct MeterImporter<'a> {
    store: &'a mut dyn Store,
    media_root: PathBuf,
    errors: Vec<String>,
    stats: MeterImportStats,
    error_report_path: Option<String>,
    error_report_url: Option<String>,
}

impl<'a> MeterImporter<'a> {
    pub fn new(store: &'a mut dyn Store, media_root: PathBuf) -> Self {
        Self {
            store,
            media_root,
            errors: Vec::new(),
            stats: MeterImportStats::default(),
            error_report_path: None,
            error_report_url: None,
        }
    }

    /// Runs the import over the uploaded xlsx bytes. Returns false when the
    /// file as a whole could not be processed; sheet- and row-level problems
    /// are recorded in the report instead.
    pub fn import(&mut self, bytes: Vec<u8>) -> bool {
        let mut workbook = match Workbook::from_bytes(bytes) {
            Ok(workbook) => workbook,
            Err(e) => {
                error!("Meter import failed to open workbook: {}", e);
                self.errors.push(format!("Ошибка при обработке файла: {}", e));
                return false;
            }
        };

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            if !name.starts_with(READINGS_SHEET_PREFIX) {
                continue;
            }
            match workbook.sheet(&name) {
                Ok(sheet) => sheets.push((name, sheet)),
                Err(e) => self.errors.push(format!("Ошибка в листе '{}': {}", name, e)),
            }
        }

        self.import_sheets(sheets)
    }

    /// Processes the recognized reading sheets. Separated from the byte
    /// decoding so the sheet-level rules run against constructed sheets too.
    fn import_sheets(&mut self, sheets: Vec<(String, Sheet)>) -> bool {
        if sheets.is_empty() {
            self.errors.push(
                "Не найдены листы с показаниями (листы должны начинаться с 'показания')"
                    .to_string(),
            );
            return false;
        }

        for (sheet_name, sheet) in &sheets {
            if self.process_sheet(sheet_name, sheet) {
                self.stats.sheets_processed += 1;
            }
        }

        if !self.stats.unmatched_pavilions.is_empty() {
            self.write_unmatched_report();
        }

        info!(
            "Meter import finished: {} sheets, {} meters created, {} updated, {} readings",
            self.stats.sheets_processed,
            self.stats.meters_created,
            self.stats.meters_updated,
            self.stats.readings_created
        );
        true
    }

    /// Processes one readings sheet inside its own transaction.
    fn process_sheet(&mut self, sheet_name: &str, sheet: &Sheet) -> bool {
        let date_label = sheet_name
            .strip_prefix(READINGS_SHEET_PREFIX)
            .unwrap_or(sheet_name)
            .trim();
        let reading_date = match parse_date_label(date_label) {
            Some(date) => date,
            None => {
                self.errors.push(format!(
                    "Не удалось распарсить дату из названия листа '{}', использована сегодняшняя дата",
                    sheet_name
                ));
                Local::now().date_naive()
            }
        };

        let missing = sheet.missing_columns(&REQUIRED_COLUMNS);
        if !missing.is_empty() {
            self.errors.push(format!(
                "В листе '{}' отсутствуют колонки: {}",
                sheet_name,
                missing.join(", ")
            ));
            return false;
        }

        if let Err(e) = self.store.begin_transaction() {
            self.errors.push(format!("Ошибка в листе '{}': {}", sheet_name, e));
            return false;
        }

        for row in sheet.rows() {
            let meter_row = MeterRow {
                meter_number: row.get("№ счетчика").trim().to_string(),
                serial_number: row.get("Серийник").trim().to_string(),
                reading: row.get("Показания").trim().to_string(),
                location: row.get("Расположение").trim().to_string(),
                hours_ago: row.get("Проверено часов назад").trim().to_string(),
            };

            if let Err(e) = self.process_row(&meter_row, reading_date) {
                error!("Store fault in sheet '{}': {}", sheet_name, e);
                if let Err(rollback_err) = self.store.rollback_transaction() {
                    error!("Rollback failed: {}", rollback_err);
                }
                self.errors.push(format!("Ошибка в листе '{}': {}", sheet_name, e));
                return false;
            }
        }

        if let Err(e) = self.store.commit_transaction() {
            self.errors.push(format!("Ошибка в листе '{}': {}", sheet_name, e));
            return false;
        }

        true
    }

    /// Upserts the meter of one row and records its reading. Business
    /// problems are recorded and swallowed; only store faults propagate.
    pub fn process_row(&mut self, row: &MeterRow, reading_date: NaiveDate) -> Result<(), StoreError> {
        if row.meter_number.is_empty() || row.location.is_empty() {
            return Ok(());
        }

        let names = expand_location_to_pavilion_names(&row.location);
        let pavilions = find_pavilions_by_names(self.store, &names, None)?;

        if pavilions.is_empty() {
            if !self.stats.unmatched_pavilions.contains(&row.location) {
                self.stats.unmatched_pavilions.push(row.location.clone());
            }
            return Ok(());
        }

        let last_verified_hours_ago = parse_hours_ago(&row.hours_ago);

        let meter = match self.store.find_meter_by_number(&row.meter_number)? {
            Some(existing) => {
                // Unconditional overwrite; an empty serial keeps the old one
                let serial = if row.serial_number.is_empty() {
                    existing.serial_number.as_str()
                } else {
                    row.serial_number.as_str()
                };
                self.store.update_meter(
                    existing.id,
                    serial,
                    &row.location,
                    last_verified_hours_ago,
                )?;
                self.stats.meters_updated += 1;
                existing
            }
            None => {
                let created = self.store.create_meter(
                    &row.meter_number,
                    &row.serial_number,
                    &row.location,
                    last_verified_hours_ago,
                )?;
                self.stats.meters_created += 1;
                created
            }
        };

        // Re-bind to exactly the resolved set, not additively
        let pavilion_ids: Vec<i32> = pavilions.iter().map(|p| p.id).collect();
        self.store.set_meter_pavilions(meter.id, &pavilion_ids)?;

        self.process_reading(meter.id, &row.meter_number, &row.reading, reading_date)
    }

    fn process_reading(
        &mut self,
        meter_id: i32,
        meter_number: &str,
        raw_reading: &str,
        reading_date: NaiveDate,
    ) -> Result<(), StoreError> {
        if raw_reading.contains(STALE_COMMUNICATION_MARKER) {
            self.errors
                .push(format!("Счетчик {}: {}", meter_number, raw_reading));
            return Ok(());
        }

        let cleaned: String = raw_reading
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();

        if cleaned.is_empty() {
            // Nothing to record
            return Ok(());
        }

        let meter_reading: f64 = match cleaned.parse() {
            Ok(value) => value,
            Err(_) => {
                self.errors.push(format!(
                    "Невалидные показания для счетчика {}: {}",
                    meter_number, raw_reading
                ));
                return Ok(());
            }
        };

        // First import wins; a later duplicate date is a no-op
        if self.store.reading_exists(meter_id, reading_date)? {
            return Ok(());
        }

        let consumption = match self.store.latest_reading_before(meter_id, reading_date)? {
            Some(previous) => meter_reading - previous.meter_reading,
            None => 0.0,
        };

        self.store
            .create_reading(meter_id, reading_date, meter_reading, consumption)?;
        self.stats.readings_created += 1;
        Ok(())
    }

    /// Writes the unmatched-pavilions list as a text file under the media
    /// root so the operator can download it.
    fn write_unmatched_report(&mut self) {
        let mut lines = vec![
            "Следующие павильоны из файла не найдены в системе:".to_string(),
            String::new(),
        ];
        for name in &self.stats.unmatched_pavilions {
            lines.push(format!("- {}", name));
        }
        lines.push(String::new());
        lines.push(format!(
            "Всего: {} павильонов",
            self.stats.unmatched_pavilions.len()
        ));
        lines.push(format!(
            "Дата отчета: {}",
            Local::now().format("%d.%m.%Y %H:%M")
        ));

        let errors_dir = self.media_root.join("meter_import_errors");
        if let Err(e) = std::fs::create_dir_all(&errors_dir) {
            error!("Cannot create report directory: {}", e);
            return;
        }

        let filename = format!(
            "meters_import_errors_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let file_path = errors_dir.join(&filename);

        match std::fs::write(&file_path, lines.join("\n")) {
            Ok(()) => {
                warn!(
                    "{} unmatched pavilions, report written to {}",
                    self.stats.unmatched_pavilions.len(),
                    file_path.display()
                );
                self.error_report_path = Some(file_path.to_string_lossy().into_owned());
                self.error_report_url =
                    Some(format!("/media/meter_import_errors/{}", filename));
            }
            Err(e) => error!("Cannot write unmatched-pavilions report: {}", e),
        }
    }

    pub fn report(&self) -> ImportReport<MeterImportStats> {
        ImportReport {
            success: self.errors.is_empty(),
            unmatched_count: self.stats.unmatched_pavilions.len(),
            stats: self.stats.clone(),
            errors: self.errors.clone(),
            error_report_path: self.error_report_path.clone(),
            error_report_url: self.error_report_url.clone(),
        }
    }
}

/// "Проверено часов назад" is an integer when present, junk otherwise.
fn parse_hours_ago(raw: &str) -> Option<i32> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn row(meter_number: &str, reading: &str, location: &str) -> MeterRow {
        MeterRow {
            meter_number: meter_number.to_string(),
            serial_number: "SN-1".to_string(),
            reading: reading.to_string(),
            location: location.to_string(),
            hours_ago: "24".to_string(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn store_with_pavilions(names: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        let building = store.insert_building("Основной рынок");
        for name in names {
            store.insert_pavilion(building.id, name);
        }
        store
    }

    #[test]
    fn test_creates_meter_with_pavilion_links() {
        let mut store = store_with_pavilions(&["Е10/1", "Е10/2"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100,00", "Е10/1,2"), date(1))
            .unwrap();

        assert_eq!(importer.stats.meters_created, 1);
        assert_eq!(importer.stats.readings_created, 1);
        drop(importer);

        let meter = store.meters().first().unwrap().clone();
        assert_eq!(meter.meter_number, "M-1");
        assert_eq!(meter.serial_number, "SN-1");
        assert_eq!(meter.last_verified_hours_ago, Some(24));
        assert_eq!(store.pavilion_ids_for_meter(meter.id).len(), 2);
    }

    #[test]
    fn test_second_import_updates_instead_of_creating() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100", "Е10/1"), date(1))
            .unwrap();
        importer
            .process_row(&row("M-1", "100", "Е10/1"), date(1))
            .unwrap();

        assert_eq!(importer.stats.meters_created, 1);
        assert_eq!(importer.stats.meters_updated, 1);
        drop(importer);
        assert_eq!(store.meters().len(), 1);
    }

    #[test]
    fn test_rebinding_replaces_pavilion_set() {
        let mut store = store_with_pavilions(&["Е10/1", "Д12/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100", "Е10/1"), date(1))
            .unwrap();
        importer
            .process_row(&row("M-1", "", "Д12/1"), date(1))
            .unwrap();
        drop(importer);

        let meter = store.meters().first().unwrap().clone();
        let linked = store.pavilion_ids_for_meter(meter.id);
        assert_eq!(linked.len(), 1);
        let pavilion = store.pavilion(linked[0]).unwrap();
        assert_eq!(pavilion.name, "Д12/1");
        assert_eq!(meter.location, "Д12/1");
    }

    #[test]
    fn test_consumption_is_delta_against_previous_reading() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100,00", "Е10/1"), date(1))
            .unwrap();
        importer
            .process_row(&row("M-1", "150,00", "Е10/1"), date(2))
            .unwrap();
        drop(importer);

        let readings = store.readings();
        assert_eq!(readings.len(), 2);
        // No prior reading on day 1
        assert_eq!(readings[0].consumption, 0.0);
        assert_eq!(readings[1].meter_reading, 150.0);
        assert_eq!(readings[1].consumption, 50.0);
    }

    #[test]
    fn test_duplicate_date_is_a_no_op() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100", "Е10/1"), date(1))
            .unwrap();
        importer
            .process_row(&row("M-1", "999", "Е10/1"), date(1))
            .unwrap();

        assert_eq!(importer.stats.readings_created, 1);
        drop(importer);
        assert_eq!(store.readings().len(), 1);
        assert_eq!(store.readings()[0].meter_reading, 100.0);
    }

    #[test]
    fn test_stale_marker_records_error_without_reading() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(
                &row("M-1", STALE_COMMUNICATION_MARKER, "Е10/1"),
                date(1),
            )
            .unwrap();

        assert_eq!(importer.stats.readings_created, 0);
        assert_eq!(importer.errors.len(), 1);
        assert!(importer.errors[0].contains("M-1"));
    }

    #[test]
    fn test_invalid_reading_records_error() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "1.2.3", "Е10/1"), date(1))
            .unwrap();

        assert_eq!(importer.stats.readings_created, 0);
        assert!(importer.errors[0].contains("Невалидные показания"));
    }

    #[test]
    fn test_empty_reading_is_skipped_silently() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "кВт·ч", "Е10/1"), date(1))
            .unwrap();

        assert_eq!(importer.stats.readings_created, 0);
        assert!(importer.errors.is_empty());
    }

    #[test]
    fn test_unmatched_location_recorded_once() {
        let mut store = store_with_pavilions(&[]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("M-1", "100", "Х99/9"), date(1))
            .unwrap();
        importer
            .process_row(&row("M-2", "200", "Х99/9"), date(1))
            .unwrap();

        assert_eq!(
            importer.stats.unmatched_pavilions,
            vec!["Х99/9".to_string()]
        );
        assert_eq!(importer.stats.meters_created, 0);
        let report = importer.report();
        assert_eq!(report.unmatched_count, 1);
    }

    #[test]
    fn test_empty_meter_number_or_location_skips_row() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        importer
            .process_row(&row("", "100", "Е10/1"), date(1))
            .unwrap();
        importer.process_row(&row("M-1", "100", ""), date(1)).unwrap();

        assert_eq!(importer.stats.meters_created, 0);
        assert!(importer.errors.is_empty());
    }

    #[test]
    fn test_hours_ago_parsing() {
        assert_eq!(parse_hours_ago("24"), Some(24));
        assert_eq!(parse_hours_ago(""), None);
        assert_eq!(parse_hours_ago("сутки"), None);
        assert_eq!(parse_hours_ago("-5"), None);
    }

    fn readings_sheet(rows: Vec<Vec<String>>) -> Sheet {
        Sheet::new(
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        )
    }

    fn sheet_row(meter: &str, reading: &str, location: &str) -> Vec<String> {
        vec![
            meter.to_string(),
            "SN-1".to_string(),
            reading.to_string(),
            location.to_string(),
            "24".to_string(),
        ]
    }

    #[test]
    fn test_file_without_reading_sheets_is_fatal() {
        let mut store = MemoryStore::new();
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        assert!(!importer.import_sheets(Vec::new()));
        assert!(importer.errors[0].contains("показания"));
        assert_eq!(importer.stats.sheets_processed, 0);
    }

    #[test]
    fn test_sheet_with_missing_columns_is_skipped_and_not_counted() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        let broken = Sheet::new(vec!["№ счетчика".to_string()], vec![]);
        let good = readings_sheet(vec![sheet_row("M-1", "100", "Е10/1")]);

        let ok = importer.import_sheets(vec![
            ("показания 01.02.2026".to_string(), broken),
            ("показания 02.02.2026".to_string(), good),
        ]);

        assert!(ok);
        assert_eq!(importer.stats.sheets_processed, 1);
        assert_eq!(importer.stats.readings_created, 1);
        assert_eq!(importer.errors.len(), 1);
        assert!(importer.errors[0].contains("отсутствуют колонки"));
    }

    #[test]
    fn test_bad_sheet_date_falls_back_to_today_with_warning() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        let sheet = readings_sheet(vec![sheet_row("M-1", "100", "Е10/1")]);
        assert!(importer.import_sheets(vec![("показания сегодня".to_string(), sheet)]));

        assert_eq!(importer.stats.sheets_processed, 1);
        assert!(importer.errors[0].contains("использована сегодняшняя дата"));
        drop(importer);
        assert_eq!(store.readings()[0].date, Local::now().date_naive());
    }

    #[test]
    fn test_dated_sheet_records_reading_on_label_date() {
        let mut store = store_with_pavilions(&["Е10/1"]);
        let mut importer = MeterImporter::new(&mut store, PathBuf::from("/tmp"));

        let sheet = readings_sheet(vec![sheet_row("M-1", "100", "Е10/1")]);
        assert!(importer.import_sheets(vec![("показания 25.02.2026".to_string(), sheet)]));
        assert!(importer.errors.is_empty());
        drop(importer);

        assert_eq!(
            store.readings()[0].date,
            NaiveDate::from_ymd_opt(2026, 2, 25).unwrap()
        );
    }
}
