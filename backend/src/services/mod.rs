use serde::Serialize;

pub mod building_rules;
pub mod contracts_importer;
pub mod meter_importer;
pub mod pavilion_loader;
pub mod pavilion_names;
pub mod pavilion_resolver;
pub mod shield_importer;
pub mod workbook;

/// Outcome of an import run, returned verbatim to the caller. `success`
/// means no errors or warnings were recorded; counters and the unmatched
/// list are always populated.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport<S: Serialize> {
    pub success: bool,
    pub stats: S,
    pub errors: Vec<String>,
    pub unmatched_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report_url: Option<String>,
}
