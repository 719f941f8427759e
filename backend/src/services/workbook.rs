//! Thin boundary over the uploaded spreadsheet: xlsx bytes in, named sheets
//! of header-keyed string cells out. Every cell is rendered as a trimmed
//! string (numbers lose a trailing ".0") so the importers see the same loose
//! text the operators typed.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;

/// Date formats accepted in sheet labels, tried in order.
pub const SHEET_DATE_FORMATS: [&str; 4] = ["%d.%m.%Y", "%d.%m.%y", "%d/%m/%Y", "%d/%m/%y"];

pub struct Workbook {
    inner: Xlsx<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, String> {
        Xlsx::new(Cursor::new(bytes))
            .map(|inner| Self { inner })
            .map_err(|e| format!("Не удалось прочитать файл Excel: {}", e))
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names().to_vec()
    }

    pub fn sheet(&mut self, name: &str) -> Result<Sheet, String> {
        let range = self
            .inner
            .worksheet_range(name)
            .map_err(|e| format!("Не удалось прочитать лист '{}': {}", name, e))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Sheet { headers, rows })
    }
}

/// One parsed sheet: a header row plus data rows of trimmed strings.
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Required columns that are absent from the header row.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| !self.headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView { sheet: self, cells })
    }
}

/// A data row with header-keyed access. Missing cells read as "".
pub struct RowView<'a> {
    sheet: &'a Sheet,
    cells: &'a [String],
}

impl RowView<'_> {
    pub fn get(&self, column: &str) -> &str {
        self.sheet
            .column_index(column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            // Meter numbers come through as floats; "12345.0" must read "12345"
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("{:?}", e),
    }
}

/// Parses the date part of a sheet label, trying the accepted formats in
/// order. Returns `None` when none of them fit.
pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    SHEET_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(label, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_label_accepts_all_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 25).unwrap();
        assert_eq!(parse_date_label("25.02.2026"), Some(expected));
        assert_eq!(parse_date_label("25.02.26"), Some(expected));
        assert_eq!(parse_date_label("25/02/2026"), Some(expected));
        assert_eq!(parse_date_label("25/02/26"), Some(expected));
    }

    #[test]
    fn test_parse_date_label_rejects_garbage() {
        assert_eq!(parse_date_label("вчера"), None);
        assert_eq!(parse_date_label(""), None);
    }

    #[test]
    fn test_missing_columns() {
        let sheet = Sheet::new(
            vec!["Контрагент".to_string(), "Договор".to_string()],
            vec![],
        );
        assert!(sheet.missing_columns(&["Контрагент", "Договор"]).is_empty());
        assert_eq!(sheet.missing_columns(&["ИНН"]), vec!["ИНН".to_string()]);
    }

    #[test]
    fn test_row_view_reads_by_header() {
        let sheet = Sheet::new(
            vec!["Объект".to_string(), "ИНН".to_string()],
            vec![vec!["Е10/1".to_string(), "123".to_string()]],
        );
        let row = sheet.rows().next().unwrap();
        assert_eq!(row.get("Объект"), "Е10/1");
        assert_eq!(row.get("ИНН"), "123");
        assert_eq!(row.get("Нет такой"), "");
    }

    #[test]
    fn test_float_cells_render_without_trailing_zero() {
        assert_eq!(cell_to_string(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_to_string(&Data::Float(150.5)), "150.5");
        assert_eq!(cell_to_string(&Data::String("  Е10/1 ".to_string())), "Е10/1");
    }
}
