use actix_web::web;

pub mod imports;

pub fn config(cfg: &mut web::ServiceConfig) {
    // Import routes (spreadsheet upload boundary)
    cfg.service(
        web::scope("/api/import")
            .service(imports::import_meters)
            .service(imports::import_contracts),
    );
}
