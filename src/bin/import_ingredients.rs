//! Loads reference ingredients from a JSON array of `{"name", "measurement_unit"}`.
//!
//! Usage: `import-ingredients [path]` (default `data/ingredients.json`).
//! Rows already present are skipped, so the import can be re-run.

use std::{env, fs, process};

use serde::Deserialize;

use foodgram::cache::IngredientCache;
use foodgram::config::Config;
use foodgram::db;
use foodgram::models::NewIngredient;
use foodgram::query;

const DEFAULT_PATH: &str = "data/ingredients.json";
const DEFAULT_UNIT: &str = "г";

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: Option<String>,
}

fn parse_records(raw: &str) -> serde_json::Result<Vec<IngredientRecord>> {
    let mut records: Vec<IngredientRecord> = serde_json::from_str(raw)?;
    records.retain(|record| !record.name.trim().is_empty());
    Ok(records)
}

fn run(path: &str) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    let raw = fs::read_to_string(path)?;
    let records = parse_records(&raw)?;
    log::info!("read {} ingredients from {path}", records.len());

    let pool = db::build_pool(&config.database_url, 1)?;
    db::run_migrations(&pool)?;

    let rows: Vec<NewIngredient> = records
        .iter()
        .map(|record| NewIngredient {
            name: record.name.trim(),
            measurement_unit: record
                .measurement_unit
                .as_deref()
                .map(str::trim)
                .filter(|unit| !unit.is_empty())
                .unwrap_or(DEFAULT_UNIT),
        })
        .collect();

    let mut conn = pool.get()?;
    let inserted = query::ingredients::insert_missing(&mut conn, &rows)?;

    if let Some(redis_url) = config.redis_url.as_deref() {
        IngredientCache::connect(redis_url)?.invalidate();
    }
    Ok(inserted)
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_PATH.to_string());
    match run(&path) {
        Ok(inserted) => log::info!("imported {inserted} new ingredients"),
        Err(e) => {
            log::error!("import failed: {e}");
            process::exit(1);
        }
    }
}
