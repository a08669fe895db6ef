use std::collections::{HashMap, HashSet};

use actix_web::{delete, get, http::header, patch, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::SqliteConnection;
use serde::Deserialize;
use serde_json::json;

use super::with_conn;
use crate::auth::{AuthUser, MaybeUser};
use crate::config::Settings;
use crate::db::DbPool;
use crate::dto::{IngredientAmountOut, RecipeOut, RecipePayload, RecipeShortOut, UserOut};
use crate::error::{ApiError, FieldErrors};
use crate::images::{self, DecodedImage, MediaStore};
use crate::models::{Membership, NewRecipe, Recipe, RecipeChanges, User};
use crate::pagination::{Page, PageParams};
use crate::query::{self, recipes::RecipeFilter};
use crate::shopping_list;

const RECIPE_IMAGES: &str = "recipes/images";

#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    author: Option<i32>,
    is_favorited: Option<String>,
    is_in_shopping_cart: Option<String>,
    name: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

impl RecipeQuery {
    /// Favorite/cart flags only apply to a logged-in viewer.
    fn to_filter(&self, viewer: Option<i32>) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            favorited_by: viewer.filter(|_| flag(self.is_favorited.as_deref())),
            in_cart_of: viewer.filter(|_| flag(self.is_in_shopping_cart.as_deref())),
            name: self.name.clone(),
        }
    }
}

/// Decodes the image field when present, reporting problems under `field`.
pub(crate) fn decode_image(field: &str, data: Option<&str>) -> Result<Option<DecodedImage>, ApiError> {
    data.map(images::decode_data_url)
        .transpose()
        .map_err(|e| ApiError::Validation(FieldErrors::single(field, e.to_string())))
}

/// Full representations for `recipes`, as seen by `viewer`.
pub(crate) fn represent(
    conn: &mut SqliteConnection,
    recipes: Vec<Recipe>,
    viewer: Option<i32>,
    media: &MediaStore,
) -> Result<Vec<RecipeOut>, ApiError> {
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<i32, User> = query::users::find_many(conn, &author_ids)?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let line_items = query::recipes::line_items(conn, &recipes)?;

    let (favorited, in_cart, followed) = match viewer {
        Some(viewer) => (
            query::membership::recipes_among(conn, Membership::Favorite, viewer, &recipe_ids)?,
            query::membership::recipes_among(conn, Membership::ShoppingCart, viewer, &recipe_ids)?,
            query::users::followed_among(conn, viewer, &author_ids)?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .zip(line_items)
        .map(|(recipe, items)| {
            let author = authors.get(&recipe.author_id).ok_or(ApiError::NotFound)?;
            Ok(RecipeOut {
                id: recipe.id,
                author: UserOut::new(author, followed.contains(&author.id), media),
                ingredients: items.into_iter().map(IngredientAmountOut::from).collect(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                image: media.url(&recipe.image),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

fn represent_one(
    conn: &mut SqliteConnection,
    recipe: Recipe,
    viewer: Option<i32>,
    media: &MediaStore,
) -> Result<RecipeOut, ApiError> {
    represent(conn, vec![recipe], viewer, media)?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound)
}

/// Loads the recipe and checks the user may change it.
fn find_owned(conn: &mut SqliteConnection, recipe_id: i32, user: &User) -> Result<Recipe, ApiError> {
    let recipe = query::recipes::find(conn, recipe_id)?;
    if recipe.author_id != user.id {
        return Err(ApiError::PermissionDenied);
    }
    Ok(recipe)
}

#[get("/recipes/")]
pub async fn list_recipes(
    req: HttpRequest,
    viewer: MaybeUser,
    filters: web::Query<RecipeQuery>,
    page: web::Query<PageParams>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let window = page.window(settings.page_size);
    let viewer_id = viewer.id();
    let filter = filters.to_filter(viewer_id);

    let (results, count) = with_conn(pool, move |conn| {
        let (rows, count) = query::recipes::page(conn, &filter, window.offset, window.limit)?;
        Ok((represent(conn, rows, viewer_id, &settings.media)?, count))
    })
    .await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, window, count, results)))
}

#[post("/recipes/")]
pub async fn create_recipe(
    user: AuthUser,
    payload: web::Json<RecipePayload>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let items = payload.validate(true)?;
    let image = decode_image("image", payload.image.as_deref())?
        .ok_or_else(|| ApiError::Validation(FieldErrors::single("image", "This field is required.")))?;
    let author = user.0;

    let recipe = with_conn(pool, move |conn| {
        let media = &settings.media;
        let image_path = media.save(RECIPE_IMAGES, &image)?;
        let new_recipe = NewRecipe {
            author_id: author.id,
            name: payload.name.as_deref().map(str::trim).unwrap_or_default(),
            text: payload.text.as_deref().map(str::trim).unwrap_or_default(),
            cooking_time: payload.cooking_time.unwrap_or_default(),
            image: &image_path,
            created_at: Utc::now().naive_utc(),
        };

        let recipe = query::recipes::create(conn, &new_recipe, &items).inspect_err(|_| media.remove(&image_path))?;
        log::info!("user {} created recipe {}", author.id, recipe.id);
        represent_one(conn, recipe, Some(author.id), media)
    })
    .await?;

    Ok(HttpResponse::Created().json(recipe))
}

#[get("/recipes/{id}/")]
pub async fn get_recipe(
    recipe_id: web::Path<i32>,
    viewer: MaybeUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = recipe_id.into_inner();
    let viewer_id = viewer.id();

    let recipe = with_conn(pool, move |conn| {
        let recipe = query::recipes::find(conn, recipe_id)?;
        represent_one(conn, recipe, viewer_id, &settings.media)
    })
    .await?;

    Ok(HttpResponse::Ok().json(recipe))
}

#[patch("/recipes/{id}/")]
pub async fn update_recipe(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    payload: web::Json<RecipePayload>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = recipe_id.into_inner();
    let payload = payload.into_inner();
    let editor = user.0;

    let recipe = with_conn(pool, move |conn| {
        let media = &settings.media;
        let current = find_owned(conn, recipe_id, &editor)?;
        let items = payload.validate(false)?;
        let image = decode_image("image", payload.image.as_deref())?;

        let new_image_path = image
            .as_ref()
            .map(|image| media.save(RECIPE_IMAGES, image))
            .transpose()?;
        let changes = RecipeChanges {
            name: payload.name.as_deref().map(str::trim),
            text: payload.text.as_deref().map(str::trim),
            cooking_time: payload.cooking_time,
            image: new_image_path.as_deref(),
        };

        let updated = query::recipes::update(conn, recipe_id, &changes, &items).inspect_err(|_| {
            if let Some(path) = &new_image_path {
                media.remove(path);
            }
        })?;
        if new_image_path.is_some() {
            media.remove(&current.image);
        }
        represent_one(conn, updated, Some(editor.id), media)
    })
    .await?;

    Ok(HttpResponse::Ok().json(recipe))
}

#[delete("/recipes/{id}/")]
pub async fn delete_recipe(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = recipe_id.into_inner();
    let owner = user.0;

    with_conn(pool, move |conn| {
        let recipe = find_owned(conn, recipe_id, &owner)?;
        query::recipes::delete(conn, recipe.id)?;
        settings.media.remove(&recipe.image);
        Ok(())
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

async fn add_membership(
    kind: Membership,
    recipe_id: i32,
    user: User,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let recipe = with_conn(pool, move |conn| {
        let recipe = query::recipes::find(conn, recipe_id)?;
        if !query::membership::add(conn, kind, user.id, recipe.id)? {
            return Err(ApiError::Conflict(kind.already_added().to_string()));
        }
        Ok(RecipeShortOut::new(&recipe, &settings.media))
    })
    .await?;

    Ok(HttpResponse::Created().json(recipe))
}

async fn remove_membership(
    kind: Membership,
    recipe_id: i32,
    user: User,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    with_conn(pool, move |conn| {
        let recipe = query::recipes::find(conn, recipe_id)?;
        if !query::membership::remove(conn, kind, user.id, recipe.id)? {
            return Err(ApiError::NotMember(kind.not_added().to_string()));
        }
        Ok(())
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[post("/recipes/{id}/favorite/")]
pub async fn add_favorite(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    add_membership(Membership::Favorite, recipe_id.into_inner(), user.0, pool, settings).await
}

#[delete("/recipes/{id}/favorite/")]
pub async fn remove_favorite(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    remove_membership(Membership::Favorite, recipe_id.into_inner(), user.0, pool).await
}

#[post("/recipes/{id}/shopping_cart/")]
pub async fn add_to_shopping_cart(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    add_membership(Membership::ShoppingCart, recipe_id.into_inner(), user.0, pool, settings).await
}

#[delete("/recipes/{id}/shopping_cart/")]
pub async fn remove_from_shopping_cart(
    recipe_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    remove_membership(Membership::ShoppingCart, recipe_id.into_inner(), user.0, pool).await
}

#[get("/recipes/download_shopping_cart/")]
pub async fn download_shopping_cart(
    user: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.0.id;
    let list = with_conn(pool, move |conn| Ok(shopping_list::for_user(conn, user_id)?)).await?;

    if list.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "message": "Shopping cart is empty",
            "status": "success",
        })));
    }

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", shopping_list::FILE_NAME),
        ))
        .body(list.render()))
}
