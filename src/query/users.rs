use std::collections::HashSet;

use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::models::{AuthToken, NewUser, User};
use crate::schema::{auth_tokens, follows, users};

pub fn find(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<User> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
}

pub fn find_by_email(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn find_many(conn: &mut SqliteConnection, ids: &[i32]) -> QueryResult<Vec<User>> {
    users::table
        .filter(users::id.eq_any(ids))
        .select(User::as_select())
        .load(conn)
}

pub fn email_taken(conn: &mut SqliteConnection, email: &str) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(email)),
    ))
    .get_result(conn)
}

pub fn username_taken(conn: &mut SqliteConnection, username: &str) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        users::table.filter(users::username.eq(username)),
    ))
    .get_result(conn)
}

pub fn insert(conn: &mut SqliteConnection, new_user: &NewUser<'_>) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

/// One page of users ordered by id, plus the total count.
pub fn page(conn: &mut SqliteConnection, offset: i64, limit: i64) -> QueryResult<(Vec<User>, i64)> {
    let total = users::table.count().get_result(conn)?;
    let rows = users::table
        .order(users::id.asc())
        .offset(offset)
        .limit(limit)
        .select(User::as_select())
        .load(conn)?;
    Ok((rows, total))
}

pub fn set_password_hash(conn: &mut SqliteConnection, user_id: i32, hash: &str) -> QueryResult<usize> {
    diesel::update(users::table.find(user_id))
        .set(users::password_hash.eq(hash))
        .execute(conn)
}

pub fn set_avatar(conn: &mut SqliteConnection, user_id: i32, path: Option<&str>) -> QueryResult<usize> {
    diesel::update(users::table.find(user_id))
        .set(users::avatar.eq(path))
        .execute(conn)
}

pub fn find_by_token(conn: &mut SqliteConnection, key: &str) -> QueryResult<Option<User>> {
    auth_tokens::table
        .inner_join(users::table)
        .filter(auth_tokens::key.eq(key))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Existing token for the user, or a freshly stored `new_key`.
pub fn get_or_create_token(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_key: String,
) -> QueryResult<AuthToken> {
    conn.transaction(|conn| {
        let existing = auth_tokens::table
            .filter(auth_tokens::user_id.eq(user_id))
            .select(AuthToken::as_select())
            .first(conn)
            .optional()?;
        if let Some(token) = existing {
            return Ok(token);
        }

        let token = AuthToken {
            key: new_key,
            user_id,
            created_at: Utc::now().naive_utc(),
        };
        diesel::insert_into(auth_tokens::table)
            .values(&token)
            .execute(conn)?;
        Ok(token)
    })
}

pub fn delete_token(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<usize> {
    diesel::delete(auth_tokens::table.filter(auth_tokens::user_id.eq(user_id))).execute(conn)
}

/// The subset of `author_ids` that `follower_id` follows.
pub fn followed_among(
    conn: &mut SqliteConnection,
    follower_id: i32,
    author_ids: &[i32],
) -> QueryResult<HashSet<i32>> {
    let ids: Vec<i32> = follows::table
        .filter(follows::follower_id.eq(follower_id))
        .filter(follows::author_id.eq_any(author_ids))
        .select(follows::author_id)
        .load(conn)?;
    Ok(ids.into_iter().collect())
}

/// One page of the users `follower_id` follows, plus the total count.
pub fn followed_page(
    conn: &mut SqliteConnection,
    follower_id: i32,
    offset: i64,
    limit: i64,
) -> QueryResult<(Vec<User>, i64)> {
    let followed = follows::table
        .filter(follows::follower_id.eq(follower_id))
        .select(follows::author_id);

    let total = users::table
        .filter(users::id.eq_any(followed.clone()))
        .count()
        .get_result(conn)?;
    let rows = users::table
        .filter(users::id.eq_any(followed))
        .order(users::username.asc())
        .offset(offset)
        .limit(limit)
        .select(User::as_select())
        .load(conn)?;
    Ok((rows, total))
}
