use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;

use crate::error::{ApiError, FieldErrors};
use crate::models::{
    Ingredient, LineItem, NewRecipe, NewRecipeIngredient, Recipe, RecipeChanges, RecipeIngredient,
    User,
};
use crate::query;
use crate::schema::{favorites, ingredients, recipe_ingredients, recipes, shopping_carts};

/// Listing filters; `None` means "don't filter on this".
#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
    pub name: Option<String>,
}

fn filtered(filter: &RecipeFilter) -> recipes::BoxedQuery<'static, Sqlite> {
    let mut query = recipes::table.into_boxed();

    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author));
    }
    if let Some(user) = filter.favorited_by {
        query = query.filter(
            recipes::id.eq_any(
                favorites::table
                    .filter(favorites::user_id.eq(user))
                    .select(favorites::recipe_id),
            ),
        );
    }
    if let Some(user) = filter.in_cart_of {
        query = query.filter(
            recipes::id.eq_any(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user))
                    .select(shopping_carts::recipe_id),
            ),
        );
    }
    if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        query = query.filter(recipes::name.like(contains_pattern(name)).escape('\\'));
    }

    query
}

fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// One page of recipes, newest first, plus the total number matching.
pub fn page(
    conn: &mut SqliteConnection,
    filter: &RecipeFilter,
    offset: i64,
    limit: i64,
) -> QueryResult<(Vec<Recipe>, i64)> {
    let total = filtered(filter).count().get_result(conn)?;
    let rows = filtered(filter)
        .order((recipes::created_at.desc(), recipes::id.desc()))
        .offset(offset)
        .limit(limit)
        .select(Recipe::as_select())
        .load(conn)?;
    Ok((rows, total))
}

pub fn find(conn: &mut SqliteConnection, recipe_id: i32) -> QueryResult<Recipe> {
    recipes::table
        .find(recipe_id)
        .select(Recipe::as_select())
        .first(conn)
}

/// Line items with their ingredient, grouped to match `parents` order.
pub fn line_items(
    conn: &mut SqliteConnection,
    parents: &[Recipe],
) -> QueryResult<Vec<Vec<(RecipeIngredient, Ingredient)>>> {
    let rows = RecipeIngredient::belonging_to(parents)
        .inner_join(ingredients::table)
        .order((ingredients::name.asc(), recipe_ingredients::id.asc()))
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .load::<(RecipeIngredient, Ingredient)>(conn)?;
    Ok(rows.grouped_by(parents))
}

/// Each author's recipes, newest first, truncated to `limit`, with the untruncated count.
pub fn by_authors(
    conn: &mut SqliteConnection,
    authors: &[User],
    limit: Option<usize>,
) -> QueryResult<Vec<(Vec<Recipe>, i64)>> {
    let rows = Recipe::belonging_to(authors)
        .order((recipes::created_at.desc(), recipes::id.desc()))
        .select(Recipe::as_select())
        .load::<Recipe>(conn)?;

    Ok(rows
        .grouped_by(authors)
        .into_iter()
        .map(|mut group| {
            let count = group.len() as i64;
            if let Some(limit) = limit {
                group.truncate(limit);
            }
            (group, count)
        })
        .collect())
}

pub fn create(
    conn: &mut SqliteConnection,
    new_recipe: &NewRecipe<'_>,
    items: &[LineItem],
) -> Result<Recipe, ApiError> {
    conn.transaction(|conn| {
        ensure_ingredients_exist(conn, items)?;
        let recipe = diesel::insert_into(recipes::table)
            .values(new_recipe)
            .returning(Recipe::as_returning())
            .get_result(conn)?;
        insert_line_items(conn, recipe.id, items)?;
        Ok(recipe)
    })
}

/// Applies `changes` and replaces the whole ingredient list. Nothing is
/// written unless every line item is valid.
pub fn update(
    conn: &mut SqliteConnection,
    recipe_id: i32,
    changes: &RecipeChanges<'_>,
    items: &[LineItem],
) -> Result<Recipe, ApiError> {
    conn.transaction(|conn| {
        ensure_ingredients_exist(conn, items)?;
        if !changes.is_empty() {
            diesel::update(recipes::table.find(recipe_id))
                .set(changes)
                .execute(conn)?;
        }
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
            .execute(conn)?;
        insert_line_items(conn, recipe_id, items)?;
        Ok(find(conn, recipe_id)?)
    })
}

pub fn delete(conn: &mut SqliteConnection, recipe_id: i32) -> QueryResult<usize> {
    diesel::delete(recipes::table.find(recipe_id)).execute(conn)
}

fn ensure_ingredients_exist(conn: &mut SqliteConnection, items: &[LineItem]) -> Result<(), ApiError> {
    let wanted: Vec<i32> = items.iter().map(|item| item.ingredient_id).collect();
    let existing = query::ingredients::existing_ids(conn, &wanted)?;

    let mut errors = FieldErrors::new();
    for missing in wanted.iter().filter(|id| !existing.contains(id)) {
        errors.add("ingredients", format!("Ingredient with id {missing} does not exist"));
    }
    errors.into_result()
}

fn insert_line_items(conn: &mut SqliteConnection, recipe_id: i32, items: &[LineItem]) -> QueryResult<usize> {
    let rows: Vec<NewRecipeIngredient> = items
        .iter()
        .map(|item| NewRecipeIngredient {
            recipe_id,
            ingredient_id: item.ingredient_id,
            amount: item.amount,
        })
        .collect();
    diesel::insert_into(recipe_ingredients::table)
        .values(&rows)
        .execute(conn)
}
