//! Import Runner - operator-driven loads for the back office
//!
//! Usage:
//!   import_runner pavilions <file.xlsx>
//!       Bulk-loads the pavilion registry from the "все павильоны 1с" sheet.
//!   import_runner shields <file.xlsx> <sheet-name>
//!       Assigns electric shields to meters from a two-column sheet.
//!
//! Environment variables:
//!   DATABASE_URL - PostgreSQL connection string (required)

use std::env;

use backend::db;
use backend::services::pavilion_loader;
use backend::services::shield_importer::ShieldImporter;
use backend::store::PgStore;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            log::error!("DATABASE_URL environment variable is not set");
            std::process::exit(1);
        }
    };
    let pool = db::init_pool(&database_url);

    let mut store = match PgStore::from_pool(&pool) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Cannot open database connection: {}", e);
            std::process::exit(1);
        }
    };

    match command {
        Some("pavilions") => {
            let path = require_arg(&args, 2, "path to the xlsx file");
            let bytes = read_file(&path);
            match pavilion_loader::load_pavilions(&mut store, bytes) {
                Ok((total, created)) => {
                    log::info!("Done: {} rows in file, {} pavilions created", total, created);
                }
                Err(e) => {
                    log::error!("Pavilion load failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some("shields") => {
            let path = require_arg(&args, 2, "path to the xlsx file");
            let sheet = require_arg(&args, 3, "sheet name");
            let bytes = read_file(&path);

            let mut importer = ShieldImporter::new(&mut store);
            let ok = importer.import(bytes, &sheet);

            let stats = importer.stats();
            log::info!(
                "Done: {} rows, {} meters updated, {} shields created, {} skipped",
                stats.total,
                stats.updated,
                stats.shields_created,
                stats.skipped
            );
            for error in importer.errors() {
                log::error!("{}", error);
            }
            if !ok {
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: import_runner pavilions <file.xlsx>");
            eprintln!("       import_runner shields <file.xlsx> <sheet-name>");
            std::process::exit(2);
        }
    }
}

fn require_arg(args: &[String], index: usize, what: &str) -> String {
    match args.get(index) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Missing argument: {}", what);
            std::process::exit(2);
        }
    }
}

fn read_file(path: &str) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Cannot read '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}
