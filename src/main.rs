use std::io;

use actix_web::{middleware, App, HttpServer};

use foodgram::cache::IngredientCache;
use foodgram::config::Config;
use foodgram::{db, AppState};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("configuration", e))?;

    // set up database connection pool
    let pool = db::build_pool(&config.database_url, config.db_pool_size)
        .map_err(|e| startup_error("database pool", e))?;
    db::run_migrations(&pool).map_err(|e| startup_error("migrations", e))?;

    let cache = match config.redis_url.as_deref() {
        Some(redis_url) => IngredientCache::connect(redis_url).unwrap_or_else(|e| {
            log::warn!("ingredient cache disabled: {e}");
            IngredientCache::disabled()
        }),
        None => {
            log::info!("REDIS_URL not set, ingredient cache disabled");
            IngredientCache::disabled()
        }
    };

    let state = AppState::new(pool, cache, config.settings.clone());

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
