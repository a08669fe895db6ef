//! `Authorization: Token <key>` authentication and password hashing.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::User;
use crate::query;

const TOKEN_SCHEME: &str = "Token";

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn new_token_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `Ok(None)` when the request carries no token credentials at all.
fn token_from_request(req: &HttpRequest) -> Result<Option<String>, ApiError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;

    let mut parts = value.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(TOKEN_SCHEME) => {}
        _ => return Ok(None),
    }
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key.to_string())),
        _ => Err(ApiError::InvalidToken),
    }
}

fn resolve(req: &HttpRequest) -> LocalBoxFuture<'static, Result<Option<User>, ApiError>> {
    let token = token_from_request(req);
    let pool = req.app_data::<web::Data<DbPool>>().cloned();

    Box::pin(async move {
        let Some(key) = token? else {
            return Ok(None);
        };
        let Some(pool) = pool else {
            log::error!("database pool missing from app data");
            return Err(ApiError::InvalidToken);
        };

        let user = web::block(move || {
            let mut conn = pool.get()?;
            Ok::<_, ApiError>(query::users::find_by_token(&mut conn, &key)?)
        })
        .await??;

        user.map(Some).ok_or(ApiError::InvalidToken)
    })
}

/// Extractor for endpoints that require a logged-in user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = resolve(req);
        Box::pin(async move { user.await?.map(AuthUser).ok_or(ApiError::NotAuthenticated) })
    }
}

/// Extractor for read endpoints open to anonymous users. A token that is
/// present but unknown is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl FromRequest for MaybeUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = resolve(req);
        Box::pin(async move { Ok(MaybeUser(user.await?)) })
    }
}
