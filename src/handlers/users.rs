use std::collections::HashSet;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use serde::Deserialize;

use super::recipes::decode_image;
use super::with_conn;
use crate::auth::{self, AuthUser, MaybeUser};
use crate::config::Settings;
use crate::db::DbPool;
use crate::dto::{
    AvatarOut, AvatarPayload, LoginPayload, RecipeShortOut, RegisterPayload, RegisteredUserOut,
    SetPasswordPayload, SubscriptionOut, TokenOut, UserOut, MIN_PASSWORD_CHARS,
};
use crate::error::{ApiError, FieldErrors};
use crate::images::MediaStore;
use crate::models::{NewUser, User};
use crate::pagination::{Page, PageParams};
use crate::query;

const AVATAR_IMAGES: &str = "users/images";

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    recipes_limit: Option<usize>,
}

fn represent_users(
    conn: &mut SqliteConnection,
    users: &[User],
    viewer: Option<i32>,
    media: &MediaStore,
) -> Result<Vec<UserOut>, ApiError> {
    let followed = match viewer {
        Some(viewer) => {
            let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
            query::users::followed_among(conn, viewer, &ids)?
        }
        None => HashSet::new(),
    };
    Ok(users
        .iter()
        .map(|user| UserOut::new(user, followed.contains(&user.id), media))
        .collect())
}

/// Followed users with their newest recipes; every author here is followed by the viewer.
fn represent_subscriptions(
    conn: &mut SqliteConnection,
    authors: &[User],
    recipes_limit: Option<usize>,
    media: &MediaStore,
) -> Result<Vec<SubscriptionOut>, ApiError> {
    let recipes = query::recipes::by_authors(conn, authors, recipes_limit)?;
    Ok(authors
        .iter()
        .zip(recipes)
        .map(|(author, (recipes, recipes_count))| SubscriptionOut {
            user: UserOut::new(author, true, media),
            recipes: recipes.iter().map(|r| RecipeShortOut::new(r, media)).collect(),
            recipes_count,
        })
        .collect())
}

/// Field behind a `UNIQUE constraint failed: users.<column>` error.
fn duplicate_user_field(message: &str) -> &'static str {
    if message.contains("users.username") {
        "username"
    } else {
        "email"
    }
}

#[post("/auth/token/login/")]
pub async fn login(
    payload: web::Json<LoginPayload>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let LoginPayload { email, password } = payload.into_inner();

    let token = with_conn(pool, move |conn| {
        let user = query::users::find_by_email(conn, email.trim())?
            .filter(|user| auth::verify_password(&password, &user.password_hash))
            .ok_or_else(|| ApiError::BadRequest("Unable to log in with provided credentials.".to_string()))?;
        Ok(query::users::get_or_create_token(conn, user.id, auth::new_token_key())?)
    })
    .await?;

    Ok(HttpResponse::Ok().json(TokenOut {
        auth_token: token.key,
    }))
}

#[post("/auth/token/logout/")]
pub async fn logout(user: AuthUser, pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let user_id = user.0.id;
    with_conn(pool, move |conn| Ok(query::users::delete_token(conn, user_id)?)).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/users/")]
pub async fn list_users(
    req: HttpRequest,
    viewer: MaybeUser,
    page: web::Query<PageParams>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let window = page.window(settings.page_size);
    let viewer_id = viewer.id();

    let (results, count) = with_conn(pool, move |conn| {
        let (users, count) = query::users::page(conn, window.offset, window.limit)?;
        Ok((represent_users(conn, &users, viewer_id, &settings.media)?, count))
    })
    .await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, window, count, results)))
}

#[post("/users/")]
pub async fn register(
    payload: web::Json<RegisterPayload>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    let user = with_conn(pool, move |conn| {
        let email = payload.email.trim();
        let username = payload.username.trim();

        let mut errors = payload.validate();
        if errors.get("email").is_none() && query::users::email_taken(conn, email)? {
            errors.add("email", "A user with that email already exists.");
        }
        if errors.get("username").is_none() && query::users::username_taken(conn, username)? {
            errors.add("username", "A user with that username already exists.");
        }
        errors.into_result()?;

        let password_hash = auth::hash_password(&payload.password, settings.bcrypt_cost)?;
        let new_user = NewUser {
            email,
            username,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            password_hash: &password_hash,
            date_joined: Utc::now().naive_utc(),
        };

        match query::users::insert(conn, &new_user) {
            Ok(user) => Ok(user),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                let field = duplicate_user_field(info.message());
                Err(ApiError::Validation(FieldErrors::single(
                    field,
                    format!("A user with that {field} already exists."),
                )))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    log::info!("registered user {}", user.id);
    Ok(HttpResponse::Created().json(RegisteredUserOut::from(&user)))
}

#[get("/users/me/")]
pub async fn me(user: AuthUser, settings: web::Data<Settings>) -> HttpResponse {
    HttpResponse::Ok().json(UserOut::new(&user.0, false, &settings.media))
}

#[put("/users/me/avatar/")]
pub async fn set_avatar(
    user: AuthUser,
    payload: web::Json<AvatarPayload>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let image = decode_image("avatar", payload.avatar.as_deref().filter(|a| !a.is_empty()))?
        .ok_or_else(|| ApiError::Validation(FieldErrors::single("avatar", "This field is required.")))?;
    let user = user.0;

    let url = with_conn(pool, move |conn| {
        let media = &settings.media;
        let path = media.save(AVATAR_IMAGES, &image)?;
        query::users::set_avatar(conn, user.id, Some(&path)).inspect_err(|_| media.remove(&path))?;
        if let Some(previous) = &user.avatar {
            media.remove(previous);
        }
        Ok(media.url(&path))
    })
    .await?;

    Ok(HttpResponse::Ok().json(AvatarOut { avatar: url }))
}

#[delete("/users/me/avatar/")]
pub async fn delete_avatar(
    user: AuthUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let user = user.0;
    let Some(previous) = user.avatar else {
        return Err(ApiError::BadRequest("Avatar is not set".to_string()));
    };

    with_conn(pool, move |conn| {
        query::users::set_avatar(conn, user.id, None)?;
        settings.media.remove(&previous);
        Ok(())
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[post("/users/set_password/")]
pub async fn set_password(
    user: AuthUser,
    payload: web::Json<SetPasswordPayload>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let SetPasswordPayload {
        current_password,
        new_password,
    } = payload.into_inner();
    let user = user.0;

    with_conn(pool, move |conn| {
        let mut errors = FieldErrors::new();
        if !auth::verify_password(&current_password, &user.password_hash) {
            errors.add("current_password", "Invalid password.");
        }
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "new_password",
                format!("Password must contain at least {MIN_PASSWORD_CHARS} characters."),
            );
        }
        errors.into_result()?;

        let hash = auth::hash_password(&new_password, settings.bcrypt_cost)?;
        query::users::set_password_hash(conn, user.id, &hash)?;
        Ok(())
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/users/subscriptions/")]
pub async fn subscriptions(
    req: HttpRequest,
    user: AuthUser,
    page: web::Query<PageParams>,
    params: web::Query<SubscriptionQuery>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let window = page.window(settings.page_size);
    let recipes_limit = params.recipes_limit;
    let follower_id = user.0.id;

    let (results, count) = with_conn(pool, move |conn| {
        let (authors, count) = query::users::followed_page(conn, follower_id, window.offset, window.limit)?;
        Ok((
            represent_subscriptions(conn, &authors, recipes_limit, &settings.media)?,
            count,
        ))
    })
    .await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, window, count, results)))
}

#[get("/users/{id}/")]
pub async fn get_user(
    user_id: web::Path<i32>,
    viewer: MaybeUser,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user_id.into_inner();
    let viewer_id = viewer.id();

    let user = with_conn(pool, move |conn| {
        let user = query::users::find(conn, user_id)?;
        represent_users(conn, &[user], viewer_id, &settings.media)?
            .pop()
            .ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

#[post("/users/{id}/subscribe/")]
pub async fn subscribe(
    author_id: web::Path<i32>,
    user: AuthUser,
    params: web::Query<SubscriptionQuery>,
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let author_id = author_id.into_inner();
    let recipes_limit = params.recipes_limit;
    let follower = user.0;

    let subscription = with_conn(pool, move |conn| {
        let author = query::users::find(conn, author_id)?;
        if author.id == follower.id {
            return Err(ApiError::BadRequest("You cannot subscribe to yourself".to_string()));
        }
        if !query::membership::follow(conn, follower.id, author.id)? {
            return Err(ApiError::Conflict("You are already subscribed to this user".to_string()));
        }
        represent_subscriptions(conn, &[author], recipes_limit, &settings.media)?
            .pop()
            .ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(HttpResponse::Created().json(subscription))
}

#[delete("/users/{id}/subscribe/")]
pub async fn unsubscribe(
    author_id: web::Path<i32>,
    user: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let author_id = author_id.into_inner();
    let follower_id = user.0.id;

    with_conn(pool, move |conn| {
        let author = query::users::find(conn, author_id)?;
        if !query::membership::unfollow(conn, follower_id, author.id)? {
            return Err(ApiError::NotMember("You are not subscribed to this user".to_string()));
        }
        Ok(())
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
