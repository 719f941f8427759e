use crate::{
    db::DbPool,
    services::building_rules::BuildingRules,
    services::contracts_importer::ContractsImporter,
    services::meter_importer::MeterImporter,
    store::PgStore,
};
use actix_web::{post, web, HttpResponse, Responder};
use std::path::PathBuf;

fn media_root() -> PathBuf {
    PathBuf::from(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()))
}

fn building_rules() -> BuildingRules {
    building_rules_from(std::env::var("BUILDING_RULES_PATH").ok())
}

fn building_rules_from(path: Option<String>) -> BuildingRules {
    match path {
        Some(path) => match BuildingRules::from_file(&path) {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!("{}; falling back to built-in building rules", e);
                BuildingRules::default()
            }
        },
        None => BuildingRules::default(),
    }
}

/// Upload an xlsx with "показания <дата>" sheets; upserts meters and
/// readings and returns the import report.
#[post("/meters")]
pub async fn import_meters(pool: web::Data<DbPool>, body: web::Bytes) -> impl Responder {
    let mut store = match PgStore::from_pool(pool.get_ref()) {
        Ok(store) => store,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };

    let mut importer = MeterImporter::new(&mut store, media_root());
    importer.import(body.to_vec());
    HttpResponse::Ok().json(importer.report())
}

/// Upload an xlsx with the "актуальные арендаторы" sheet; reconciles
/// tenants, contracts and pavilion links and returns the import report.
#[post("/contracts")]
pub async fn import_contracts(pool: web::Data<DbPool>, body: web::Bytes) -> impl Responder {
    let mut store = match PgStore::from_pool(pool.get_ref()) {
        Ok(store) => store,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };

    let mut importer = ContractsImporter::new(&mut store, building_rules());
    importer.import(body.to_vec());
    HttpResponse::Ok().json(importer.report())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_rules_path_falls_back_to_defaults() {
        let rules = building_rules_from(Some("/nonexistent/rules.json".to_string()));
        assert_eq!(rules.default_building, "Основной рынок");
        assert_eq!(rules.rules.len(), 3);
    }

    #[test]
    fn test_missing_rules_path_uses_defaults() {
        let rules = building_rules_from(None);
        assert_eq!(rules.default_building, "Основной рынок");
        assert_eq!(rules.marker, "№");
    }
}
