//! HTTP surface under `/api`. Handlers do their diesel work inside
//! `web::block` on a pooled connection, one unit of work per request.

use actix_web::{web, Scope};
use diesel::SqliteConnection;

use crate::db::DbPool;
use crate::error::ApiError;

pub mod ingredients;
pub mod recipes;
pub mod users;

pub fn api() -> Scope {
    web::scope("/api")
        .service(ingredients::get_all_ingredients)
        .service(ingredients::get_ingredient)
        // fixed paths before /recipes/{id}/ and /users/{id}/
        .service(recipes::download_shopping_cart)
        .service(recipes::list_recipes)
        .service(recipes::create_recipe)
        .service(recipes::get_recipe)
        .service(recipes::update_recipe)
        .service(recipes::delete_recipe)
        .service(recipes::add_favorite)
        .service(recipes::remove_favorite)
        .service(recipes::add_to_shopping_cart)
        .service(recipes::remove_from_shopping_cart)
        .service(users::login)
        .service(users::logout)
        .service(users::list_users)
        .service(users::register)
        .service(users::me)
        .service(users::set_avatar)
        .service(users::delete_avatar)
        .service(users::set_password)
        .service(users::subscriptions)
        .service(users::get_user)
        .service(users::subscribe)
        .service(users::unsubscribe)
}

/// Runs `f` on a pooled connection in the blocking thread pool.
pub(crate) async fn with_conn<F, T>(pool: web::Data<DbPool>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    web::block(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}
