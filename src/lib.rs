//! Foodgram backend: recipes, ingredients, favorites, shopping carts and
//! follows behind a token-authenticated JSON API.

use actix_web::web;

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod images;
pub mod models;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod shopping_list;

use cache::IngredientCache;
use config::Settings;
use db::DbPool;
use error::ApiError;

/// Shared handles every worker's `App` is built from.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub cache: web::Data<IngredientCache>,
    pub settings: web::Data<Settings>,
}

impl AppState {
    pub fn new(pool: DbPool, cache: IngredientCache, settings: Settings) -> Self {
        Self {
            pool,
            cache: web::Data::new(cache),
            settings: web::Data::new(settings),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.pool.clone()))
            .app_data(self.cache.clone())
            .app_data(self.settings.clone())
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
            )
            .service(handlers::api());
    }
}
