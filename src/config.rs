use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;

use crate::images::MediaStore;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Process configuration, read once from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub settings: Settings,
}

/// The part of the configuration request handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub media: MediaStore,
    pub page_size: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        let mut media_url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string());
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        let page_size: i64 = parse_or("PAGE_SIZE", 6)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url,
            redis_url,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 8080)?,
            db_pool_size: parse_or("DB_POOL_SIZE", 8)?,
            settings: Settings {
                media: MediaStore::new(
                    env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
                    media_url,
                ),
                page_size,
                bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
        })
    }
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
