//! Request bodies with their validation, and the JSON shapes the API returns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, FieldErrors};
use crate::images::MediaStore;
use crate::models::{Ingredient, LineItem, Recipe, RecipeIngredient, User};

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;
pub const MAX_RECIPE_NAME_CHARS: usize = 256;
pub const MAX_USERNAME_CHARS: usize = 150;
pub const MAX_NAME_CHARS: usize = 150;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPayload {
    pub id: i32,
    pub amount: i32,
}

/// Body of recipe create (`POST`) and update (`PATCH`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub ingredients: Option<Vec<LineItemPayload>>,
}

impl RecipePayload {
    /// Checks that need no database. `creating` makes every field mandatory;
    /// on update only `ingredients` is.
    pub fn validate(&self, creating: bool) -> Result<Vec<LineItem>, ApiError> {
        let mut errors = FieldErrors::new();

        match self.name.as_deref().map(str::trim) {
            None if creating => errors.add("name", "This field is required."),
            Some("") => errors.add("name", "This field may not be blank."),
            Some(name) if name.chars().count() > MAX_RECIPE_NAME_CHARS => errors.add(
                "name",
                format!("Ensure this field has no more than {MAX_RECIPE_NAME_CHARS} characters."),
            ),
            _ => {}
        }
        match self.text.as_deref().map(str::trim) {
            None if creating => errors.add("text", "This field is required."),
            Some("") => errors.add("text", "This field may not be blank."),
            _ => {}
        }
        match self.cooking_time {
            None if creating => errors.add("cooking_time", "This field is required."),
            Some(minutes) if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&minutes) => errors.add(
                "cooking_time",
                format!("Cooking time must be between {MIN_AMOUNT} and {MAX_AMOUNT}."),
            ),
            _ => {}
        }
        match self.image.as_deref() {
            None if creating => errors.add("image", "This field is required."),
            Some("") => errors.add("image", "This field may not be blank."),
            _ => {}
        }

        let items = validate_line_items(self.ingredients.as_deref(), &mut errors);
        errors.into_result()?;
        Ok(items)
    }
}

fn validate_line_items(payload: Option<&[LineItemPayload]>, errors: &mut FieldErrors) -> Vec<LineItem> {
    let Some(payload) = payload else {
        errors.add("ingredients", "This field is required.");
        return Vec::new();
    };
    if payload.is_empty() {
        errors.add("ingredients", "A recipe needs at least one ingredient.");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    for item in payload {
        if !seen.insert(item.id) {
            errors.add("ingredients", format!("Ingredient {} is listed more than once.", item.id));
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
            errors.add(
                "ingredients",
                format!("Amount of ingredient {} must be between {MIN_AMOUNT} and {MAX_AMOUNT}.", item.id),
            );
        }
    }

    payload
        .iter()
        .map(|item| LineItem {
            ingredient_id: item.id,
            amount: item.amount,
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

impl RegisterPayload {
    /// Format checks only; uniqueness is checked against the store.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if email.chars().count() > MAX_EMAIL_CHARS || !is_plausible_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field may not be blank.");
        } else if username.chars().count() > MAX_USERNAME_CHARS {
            errors.add(
                "username",
                format!("Ensure this field has no more than {MAX_USERNAME_CHARS} characters."),
            );
        } else if !username.chars().all(is_username_char) {
            errors.add(
                "username",
                "Enter a valid username. Letters, digits and @/./+/-/_ only.",
            );
        }

        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.chars().count() > MAX_NAME_CHARS {
                errors.add(
                    field,
                    format!("Ensure this field has no more than {MAX_NAME_CHARS} characters."),
                );
            }
        }

        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("Password must contain at least {MIN_PASSWORD_CHARS} characters."),
            );
        }

        errors
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarPayload {
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarOut {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUserOut {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for RegisteredUserOut {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserOut {
    pub fn new(user: &User, is_subscribed: bool, media: &MediaStore) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
            avatar: user.avatar.as_deref().map(|path| media.url(path)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientAmountOut {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<(RecipeIngredient, Ingredient)> for IngredientAmountOut {
    fn from((item, ingredient): (RecipeIngredient, Ingredient)) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeOut {
    pub id: i32,
    pub author: UserOut,
    pub ingredients: Vec<IngredientAmountOut>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// The short form returned by favorite/cart toggles and inside subscriptions.
#[derive(Debug, Serialize)]
pub struct RecipeShortOut {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShortOut {
    pub fn new(recipe: &Recipe, media: &MediaStore) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionOut {
    #[serde(flatten)]
    pub user: UserOut,
    pub recipes: Vec<RecipeShortOut>,
    pub recipes_count: i64,
}
