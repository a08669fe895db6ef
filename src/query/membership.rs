//! Add/remove of (user, recipe) and (follower, author) pairs.
//!
//! Adds rely on the unique constraints: `ON CONFLICT DO NOTHING` inserting zero
//! rows means the pair already existed, so two racing requests cannot both
//! create it.

use std::collections::HashSet;

use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::models::Membership;
use crate::schema::{favorites, follows, shopping_carts};

/// `true` if the pair was created, `false` if it already existed.
pub fn add(conn: &mut SqliteConnection, kind: Membership, user_id: i32, recipe_id: i32) -> QueryResult<bool> {
    let inserted = match kind {
        Membership::Favorite => diesel::insert_into(favorites::table)
            .values((
                favorites::user_id.eq(user_id),
                favorites::recipe_id.eq(recipe_id),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?,
        Membership::ShoppingCart => diesel::insert_into(shopping_carts::table)
            .values((
                shopping_carts::user_id.eq(user_id),
                shopping_carts::recipe_id.eq(recipe_id),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?,
    };
    Ok(inserted == 1)
}

/// `true` if the pair existed and was deleted.
pub fn remove(conn: &mut SqliteConnection, kind: Membership, user_id: i32, recipe_id: i32) -> QueryResult<bool> {
    let deleted = match kind {
        Membership::Favorite => diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(user_id))
                .filter(favorites::recipe_id.eq(recipe_id)),
        )
        .execute(conn)?,
        Membership::ShoppingCart => diesel::delete(
            shopping_carts::table
                .filter(shopping_carts::user_id.eq(user_id))
                .filter(shopping_carts::recipe_id.eq(recipe_id)),
        )
        .execute(conn)?,
    };
    Ok(deleted > 0)
}

/// The subset of `recipe_ids` the user has in the given relation.
pub fn recipes_among(
    conn: &mut SqliteConnection,
    kind: Membership,
    user_id: i32,
    recipe_ids: &[i32],
) -> QueryResult<HashSet<i32>> {
    let found: Vec<i32> = match kind {
        Membership::Favorite => favorites::table
            .filter(favorites::user_id.eq(user_id))
            .filter(favorites::recipe_id.eq_any(recipe_ids))
            .select(favorites::recipe_id)
            .load(conn)?,
        Membership::ShoppingCart => shopping_carts::table
            .filter(shopping_carts::user_id.eq(user_id))
            .filter(shopping_carts::recipe_id.eq_any(recipe_ids))
            .select(shopping_carts::recipe_id)
            .load(conn)?,
    };
    Ok(found.into_iter().collect())
}

/// `true` if the follow was created, `false` if it already existed.
/// Self-follows are rejected by the caller before this runs.
pub fn follow(conn: &mut SqliteConnection, follower_id: i32, author_id: i32) -> QueryResult<bool> {
    let inserted = diesel::insert_into(follows::table)
        .values((
            follows::follower_id.eq(follower_id),
            follows::author_id.eq(author_id),
        ))
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(inserted == 1)
}

pub fn unfollow(conn: &mut SqliteConnection, follower_id: i32, author_id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(
        follows::table
            .filter(follows::follower_id.eq(follower_id))
            .filter(follows::author_id.eq(author_id)),
    )
    .execute(conn)?;
    Ok(deleted > 0)
}
