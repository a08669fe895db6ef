//! Redis copy of the ingredient list.
//!
//! Ingredients are reference data that is read on every recipe form, so the
//! whole list is kept bincode-encoded under one key. Redis is optional: with no
//! pool, or with the breaker open, callers go straight to the database.

use std::ops::DerefMut;
use std::time::Duration;

use diesel::r2d2;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::backoff::EqualJittered;
use failsafe::{CircuitBreaker, Config, StateMachine};
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;

use crate::models::Ingredient;

pub type RedisPool = r2d2::Pool<RedisConnectionManager>;

type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_MIN_IDLE: u32 = 8;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;
const CACHE_POOL_CONNECT_TIMEOUT_MILLIS: u64 = 250;
const INGREDIENTS_TTL_SECONDS: usize = 300;

const ALL_INGREDIENTS_KEY: &str = "ingredients:all";

#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error(transparent)]
    Pool(#[from] r2d2::PoolError),

    #[error(transparent)]
    Redis(#[from] RedisError),

    #[error(transparent)]
    Codec(#[from] bincode::Error),
}

pub struct IngredientCache {
    redis_pool: Option<RedisPool>,
    circuit_breaker: CircuitBreakerType,
}

impl IngredientCache {
    pub fn disabled() -> Self {
        Self {
            redis_pool: None,
            circuit_breaker: Config::new().build(),
        }
    }

    /// The pool is built lazily so a Redis outage at startup does not stop the server.
    pub fn connect(redis_url: &str) -> Result<Self, RedisError> {
        let manager = RedisConnectionManager::new(redis_url)?;
        let redis_pool = r2d2::Pool::builder()
            .max_size(CACHE_POOL_MAX_OPEN)
            .max_lifetime(Some(Duration::from_secs(CACHE_POOL_EXPIRE_SECONDS)))
            .min_idle(Some(CACHE_POOL_MIN_IDLE))
            .connection_timeout(Duration::from_millis(CACHE_POOL_CONNECT_TIMEOUT_MILLIS))
            .build_unchecked(manager);

        Ok(Self {
            redis_pool: Some(redis_pool),
            circuit_breaker: Config::new().build(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.redis_pool.is_some()
    }

    /// `None` on a miss or when the cache is unavailable.
    pub fn load(&self) -> Option<Vec<Ingredient>> {
        let pool = self.redis_pool.as_ref()?;
        if !self.circuit_breaker.is_call_permitted() {
            return None;
        }

        let result = self.circuit_breaker.call(|| -> Result<Option<Vec<Ingredient>>, CacheError> {
            let mut redis_conn = pool.get()?;
            let bytes: Option<Vec<u8>> = redis_conn.deref_mut().get(ALL_INGREDIENTS_KEY)?;
            match bytes {
                Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
                None => Ok(None),
            }
        });

        match result {
            Ok(found) => found,
            Err(failsafe::Error::Inner(e)) => {
                log::warn!("ingredient cache read failed: {e}");
                None
            }
            Err(failsafe::Error::Rejected) => None,
        }
    }

    pub fn store(&self, ingredients: &[Ingredient]) {
        let Some(pool) = self.redis_pool.as_ref() else {
            return;
        };
        if !self.circuit_breaker.is_call_permitted() {
            return;
        }

        let result = self.circuit_breaker.call(|| -> Result<(), CacheError> {
            let value = bincode::serialize(ingredients)?;
            let mut redis_conn = pool.get()?;
            redis_conn
                .deref_mut()
                .set_ex::<_, _, ()>(ALL_INGREDIENTS_KEY, value, INGREDIENTS_TTL_SECONDS)?;
            Ok(())
        });

        if let Err(failsafe::Error::Inner(e)) = result {
            log::warn!("ingredient cache write failed: {e}");
        }
    }

    /// Drop the cached list after the ingredient table changes.
    pub fn invalidate(&self) {
        let Some(pool) = self.redis_pool.as_ref() else {
            return;
        };

        let result = pool
            .get()
            .map_err(CacheError::from)
            .and_then(|mut redis_conn| {
                redis_conn
                    .deref_mut()
                    .del::<_, ()>(ALL_INGREDIENTS_KEY)
                    .map_err(CacheError::from)
            });
        if let Err(e) = result {
            log::warn!("ingredient cache invalidation failed: {e}");
        }
    }
}
