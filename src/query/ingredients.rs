use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::models::{Ingredient, NewIngredient};
use crate::schema::ingredients::dsl::*;

pub fn find_all(conn: &mut SqliteConnection) -> QueryResult<Vec<Ingredient>> {
    ingredients
        .order((name.asc(), measurement_unit.asc()))
        .select(Ingredient::as_select())
        .load(conn)
}

pub fn find(conn: &mut SqliteConnection, ingredient_id: i32) -> QueryResult<Ingredient> {
    ingredients
        .find(ingredient_id)
        .select(Ingredient::as_select())
        .first(conn)
}

/// Ids out of `candidates` that reference an existing ingredient.
pub fn existing_ids(conn: &mut SqliteConnection, candidates: &[i32]) -> QueryResult<Vec<i32>> {
    ingredients
        .filter(id.eq_any(candidates))
        .select(id)
        .load(conn)
}

/// Insert every (name, unit) pair not already present; returns how many were new.
pub fn insert_missing(conn: &mut SqliteConnection, items: &[NewIngredient<'_>]) -> QueryResult<usize> {
    conn.transaction(|conn| {
        let mut inserted = 0;
        for item in items {
            inserted += diesel::insert_into(ingredients)
                .values(item)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Case-insensitive name prefix match, keeping the input order.
pub fn filter_by_prefix(all: Vec<Ingredient>, prefix: &str) -> Vec<Ingredient> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return all;
    }
    all.into_iter()
        .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
        .collect()
}
