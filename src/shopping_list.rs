//! Shopping list: every ingredient of every recipe in a user's cart, summed per
//! ingredient and rendered as a plain-text report.
//!
//! Ingredients are keyed by (name, unit), so "flour, g" and "flour, kg" stay
//! separate lines. Lines come out sorted by name, then unit.

use std::collections::BTreeMap;
use std::fmt;

use diesel::prelude::*;
use diesel::SqliteConnection;

pub const FILE_NAME: &str = "shopping_list.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub unit: String,
    pub total: i64,
}

impl fmt::Display for ShoppingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.total, self.unit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    lines: Vec<ShoppingLine>,
}

impl ShoppingList {
    /// Group `(name, unit, amount)` rows by ingredient and sum the amounts.
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String, i32)>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for (name, unit, amount) in rows {
            *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
        }

        let lines = totals
            .into_iter()
            .map(|((name, unit), total)| ShoppingLine { name, unit, total })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[ShoppingLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// One `"<name> - <total> <unit>"` line per ingredient, each newline-terminated.
    pub fn render(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

/// Recomputes the list for `user_id` from the current cart contents.
pub fn for_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<ShoppingList> {
    use crate::schema::{ingredients, recipe_ingredients, shopping_carts};

    let cart = shopping_carts::table
        .filter(shopping_carts::user_id.eq(user_id))
        .select(shopping_carts::recipe_id);

    let rows = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(cart))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            recipe_ingredients::amount,
        ))
        .load::<(String, String, i32)>(conn)?;

    Ok(ShoppingList::aggregate(rows))
}
