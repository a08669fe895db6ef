use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use super::with_conn;
use crate::cache::IngredientCache;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::Ingredient;
use crate::query;

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    name: Option<String>,
}

#[get("/ingredients/")]
pub async fn get_all_ingredients(
    params: web::Query<IngredientQuery>,
    pool: web::Data<DbPool>,
    cache: web::Data<IngredientCache>,
) -> Result<HttpResponse, ApiError> {
    let all = web::block(move || -> Result<Vec<Ingredient>, ApiError> {
        if let Some(cached) = cache.load() {
            return Ok(cached);
        }
        let mut conn = pool.get()?;
        let all = query::ingredients::find_all(&mut conn)?;
        cache.store(&all);
        Ok(all)
    })
    .await??;

    let prefix = params.name.as_deref().unwrap_or_default();
    Ok(HttpResponse::Ok().json(query::ingredients::filter_by_prefix(all, prefix)))
}

#[get("/ingredients/{id}/")]
pub async fn get_ingredient(
    ingredient_id: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let ingredient_id = ingredient_id.into_inner();
    let ingredient = with_conn(pool, move |conn| {
        Ok(query::ingredients::find(conn, ingredient_id)?)
    })
    .await?;
    Ok(HttpResponse::Ok().json(ingredient))
}
