use actix_web::{http::header, http::StatusCode, test, App};
use chrono::Utc;
use diesel::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

use foodgram::cache::IngredientCache;
use foodgram::config::Settings;
use foodgram::images::MediaStore;
use foodgram::models::{LineItem, NewIngredient, NewRecipe, NewUser, User};
use foodgram::{auth, db, query, AppState};

const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
const PASSWORD: &str = "secret-password";

struct TestEnv {
    _dir: TempDir,
    state: AppState,
}

fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("foodgram.sqlite3");
    let pool = db::build_pool(db_path.to_str().unwrap(), 4).unwrap();
    db::run_migrations(&pool).unwrap();

    let settings = Settings {
        media: MediaStore::new(dir.path().join("media"), "/media/"),
        page_size: 6,
        bcrypt_cost: 4,
    };
    TestEnv {
        state: AppState::new(pool, IngredientCache::disabled(), settings),
        _dir: dir,
    }
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(App::new().configure(|cfg| $env.state.configure(cfg))).await
    };
}

impl TestEnv {
    /// Creates a user directly in the store and returns it with a login token.
    fn user(&self, name: &str) -> (User, String) {
        let mut conn = self.state.pool.get().unwrap();
        let hash = auth::hash_password(PASSWORD, 4).unwrap();
        let email = format!("{name}@example.com");
        let user = query::users::insert(
            &mut conn,
            &NewUser {
                email: &email,
                username: name,
                first_name: "Test",
                last_name: "Cook",
                password_hash: &hash,
                date_joined: Utc::now().naive_utc(),
            },
        )
        .unwrap();
        let token = query::users::get_or_create_token(&mut conn, user.id, auth::new_token_key()).unwrap();
        (user, format!("Token {}", token.key))
    }

    fn ingredient(&self, name: &str, unit: &str) -> i32 {
        let mut conn = self.state.pool.get().unwrap();
        query::ingredients::insert_missing(
            &mut conn,
            &[NewIngredient {
                name,
                measurement_unit: unit,
            }],
        )
        .unwrap();
        query::ingredients::find_all(&mut conn)
            .unwrap()
            .into_iter()
            .find(|i| i.name == name && i.measurement_unit == unit)
            .unwrap()
            .id
    }

    fn recipe(&self, author: &User, name: &str, items: &[(i32, i32)]) -> i32 {
        let mut conn = self.state.pool.get().unwrap();
        let items: Vec<LineItem> = items
            .iter()
            .map(|&(ingredient_id, amount)| LineItem { ingredient_id, amount })
            .collect();
        query::recipes::create(
            &mut conn,
            &NewRecipe {
                author_id: author.id,
                name,
                text: "Mix everything.",
                cooking_time: 15,
                image: "recipes/images/seed.png",
                created_at: Utc::now().naive_utc(),
            },
            &items,
        )
        .unwrap()
        .id
    }

    fn amounts(&self, recipe_id: i32) -> Vec<(i32, i32)> {
        let mut conn = self.state.pool.get().unwrap();
        let recipe = query::recipes::find(&mut conn, recipe_id).unwrap();
        let mut rows: Vec<(i32, i32)> = query::recipes::line_items(&mut conn, &[recipe])
            .unwrap()
            .remove(0)
            .into_iter()
            .map(|(item, ingredient)| (ingredient.id, item.amount))
            .collect();
        rows.sort_unstable();
        rows
    }

    fn favorite_rows(&self, user_id: i32, recipe_id: i32) -> i64 {
        use foodgram::schema::favorites;
        let mut conn = self.state.pool.get().unwrap();
        favorites::table
            .filter(favorites::user_id.eq(user_id))
            .filter(favorites::recipe_id.eq(recipe_id))
            .count()
            .get_result(&mut conn)
            .unwrap()
    }

    fn cart_rows(&self, user_id: i32) -> i64 {
        use foodgram::schema::shopping_carts;
        let mut conn = self.state.pool.get().unwrap();
        shopping_carts::table
            .filter(shopping_carts::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .unwrap()
    }

    fn follow_rows(&self) -> i64 {
        use foodgram::schema::follows;
        let mut conn = self.state.pool.get().unwrap();
        follows::table.count().get_result(&mut conn).unwrap()
    }
}

#[actix_web::test]
async fn shopping_list_sums_ingredients_across_cart() {
    let env = test_env();
    let (author, _) = env.user("author");
    let (cook, token) = env.user("cook");
    let flour = env.ingredient("flour", "g");
    let egg = env.ingredient("egg", "pcs");
    let pancakes = env.recipe(&author, "Pancakes", &[(flour, 200), (egg, 2)]);
    let bread = env.recipe(&author, "Bread", &[(flour, 100)]);
    let app = init_app!(env);

    for recipe_id in [pancakes, bread] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/recipes/{recipe_id}/shopping_cart/"))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    assert_eq!(env.cart_rows(cook.id), 2);

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment") && disposition.contains("shopping_list.txt"));

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), ["egg - 2 pcs", "flour - 300 g"]);
}

#[actix_web::test]
async fn empty_cart_download_is_a_success() {
    let env = test_env();
    let (_, token) = env.user("cook");
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "success");
}

#[actix_web::test]
async fn download_requires_authentication() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart/")
        .insert_header((header::AUTHORIZATION, "Token not-a-real-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Invalid token.");
}

#[actix_web::test]
async fn favoriting_twice_conflicts_and_keeps_one_row() {
    let env = test_env();
    let (author, _) = env.user("author");
    let (cook, token) = env.user("cook");
    let salt = env.ingredient("salt", "g");
    let soup = env.recipe(&author, "Soup", &[(salt, 5)]);
    let app = init_app!(env);

    let favorite = || {
        test::TestRequest::post()
            .uri(&format!("/api/recipes/{soup}/favorite/"))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request()
    };

    let resp = test::call_service(&app, favorite()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], soup);
    assert_eq!(body["name"], "Soup");
    assert_eq!(body["cooking_time"], 15);

    let resp = test::call_service(&app, favorite()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.favorite_rows(cook.id, soup), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/recipes/{soup}/favorite/"))
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.favorite_rows(cook.id, soup), 0);
}

#[actix_web::test]
async fn removing_a_missing_cart_pair_fails_without_rows() {
    let env = test_env();
    let (author, _) = env.user("author");
    let (cook, token) = env.user("cook");
    let salt = env.ingredient("salt", "g");
    let soup = env.recipe(&author, "Soup", &[(salt, 5)]);
    let app = init_app!(env);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/recipes/{soup}/shopping_cart/"))
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.cart_rows(cook.id), 0);

    let req = test::TestRequest::post()
        .uri("/api/recipes/9999/shopping_cart/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn users_cannot_follow_themselves() {
    let env = test_env();
    let (cook, token) = env.user("cook");
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/subscribe/", cook.id))
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.follow_rows(), 0);
}

#[actix_web::test]
async fn follow_and_unfollow() {
    let env = test_env();
    let (author, _) = env.user("author");
    let (_, token) = env.user("cook");
    let salt = env.ingredient("salt", "g");
    env.recipe(&author, "Soup", &[(salt, 5)]);
    env.recipe(&author, "Stew", &[(salt, 7)]);
    let app = init_app!(env);

    let subscribe = || {
        test::TestRequest::post()
            .uri(&format!("/api/users/{}/subscribe/?recipes_limit=1", author.id))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request()
    };
    let resp = test::call_service(&app, subscribe()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 2);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);

    let resp = test::call_service(&app, subscribe()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.follow_rows(), 1);

    let req = test::TestRequest::get()
        .uri("/api/users/subscriptions/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "author");

    let unsubscribe = || {
        test::TestRequest::delete()
            .uri(&format!("/api/users/{}/subscribe/", author.id))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request()
    };
    let resp = test::call_service(&app, unsubscribe()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = test::call_service(&app, unsubscribe()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.follow_rows(), 0);
}

#[actix_web::test]
async fn empty_ingredient_update_keeps_previous_list() {
    let env = test_env();
    let (author, token) = env.user("author");
    let flour = env.ingredient("flour", "g");
    let egg = env.ingredient("egg", "pcs");
    let pancakes = env.recipe(&author, "Pancakes", &[(flour, 200), (egg, 2)]);
    let before = env.amounts(pancakes);
    let app = init_app!(env);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/recipes/{pancakes}/"))
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({ "name": "Renamed", "ingredients": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["ingredients"].is_array());

    assert_eq!(env.amounts(pancakes), before);
    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/{pancakes}/"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["name"], "Pancakes");
}

#[actix_web::test]
async fn update_replaces_line_items_wholesale() {
    let env = test_env();
    let (author, token) = env.user("author");
    let (_, stranger_token) = env.user("stranger");
    let flour = env.ingredient("flour", "g");
    let egg = env.ingredient("egg", "pcs");
    let milk = env.ingredient("milk", "ml");
    let pancakes = env.recipe(&author, "Pancakes", &[(flour, 200), (egg, 2)]);
    let app = init_app!(env);

    let patch = |auth: &str, ingredients: Value| {
        test::TestRequest::patch()
            .uri(&format!("/api/recipes/{pancakes}/"))
            .insert_header((header::AUTHORIZATION, auth.to_string()))
            .set_json(json!({ "cooking_time": 30, "ingredients": ingredients }))
            .to_request()
    };

    let resp = test::call_service(&app, patch(&stranger_token, json!([{ "id": milk, "amount": 1 }]))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let duplicate = json!([{ "id": milk, "amount": 1 }, { "id": milk, "amount": 2 }]);
    let resp = test::call_service(&app, patch(&token, duplicate)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let unknown = json!([{ "id": 4242, "amount": 1 }]);
    let resp = test::call_service(&app, patch(&token, unknown)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.amounts(pancakes), [(flour, 200), (egg, 2)]);

    let resp = test::call_service(&app, patch(&token, json!([{ "id": milk, "amount": 250 }]))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["cooking_time"], 30);
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(body["ingredients"][0]["measurement_unit"], "ml");
    assert_eq!(env.amounts(pancakes), [(milk, 250)]);
}

#[actix_web::test]
async fn create_recipe_through_the_api() {
    let env = test_env();
    let (author, token) = env.user("author");
    let flour = env.ingredient("flour", "g");
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/recipes/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({
            "name": "Flatbread",
            "text": "Knead and bake.",
            "cooking_time": 25,
            "image": PIXEL_PNG,
            "ingredients": [{ "id": flour, "amount": 300 }],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["author"]["id"], author.id);
    assert_eq!(body["is_favorited"], false);
    assert_eq!(body["ingredients"][0]["amount"], 300);
    assert!(body["image"].as_str().unwrap().starts_with("/media/recipes/images/"));

    let req = test::TestRequest::post()
        .uri("/api/recipes/")
        .set_json(json!({ "name": "Anonymous" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/recipes/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({
            "name": "Nothing",
            "text": "Air.",
            "cooking_time": 0,
            "image": PIXEL_PNG,
            "ingredients": [],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["cooking_time"].is_array());
    assert!(body["ingredients"].is_array());
}

#[actix_web::test]
async fn recipe_list_filters_by_viewer_flags() {
    let env = test_env();
    let (author, _) = env.user("author");
    let (_, token) = env.user("cook");
    let salt = env.ingredient("salt", "g");
    let soup = env.recipe(&author, "Soup", &[(salt, 5)]);
    env.recipe(&author, "Stew", &[(salt, 7)]);
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri(&format!("/api/recipes/{soup}/favorite/"))
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/recipes/?is_favorited=1")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["is_favorited"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/?author={}&limit=1", author.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert!(body["next"].is_string());
}

#[actix_web::test]
async fn register_login_and_profile() {
    let env = test_env();
    let app = init_app!(env);

    let registration = json!({
        "email": "new@example.com",
        "username": "new.cook",
        "first_name": "New",
        "last_name": "Cook",
        "password": PASSWORD,
    });
    let req = test::TestRequest::post()
        .uri("/api/users/")
        .set_json(&registration)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "new.cook");
    assert!(body.get("password").is_none());

    let req = test::TestRequest::post()
        .uri("/api/users/")
        .set_json(&registration)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/auth/token/login/")
        .set_json(json!({ "email": "new@example.com", "password": "wrong password" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/auth/token/login/")
        .set_json(json!({ "email": "new@example.com", "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = format!("Token {}", body["auth_token"].as_str().unwrap());

    let req = test::TestRequest::get()
        .uri("/api/users/me/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["email"], "new@example.com");
    assert_eq!(body["avatar"], Value::Null);

    let req = test::TestRequest::put()
        .uri("/api/users/me/avatar/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({ "avatar": PIXEL_PNG }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["avatar"].as_str().unwrap().starts_with("/media/users/images/"));

    let req = test::TestRequest::post()
        .uri("/api/auth/token/logout/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/me/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn ingredient_search_matches_name_prefix() {
    let env = test_env();
    env.ingredient("flour", "g");
    env.ingredient("Flaxseed", "g");
    env.ingredient("egg", "pcs");
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/ingredients/?name=fl").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Flaxseed", "flour"]);

    let req = test::TestRequest::get().uri("/api/ingredients/9999/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn only_the_author_deletes_and_memberships_go_with_the_recipe() {
    let env = test_env();
    let (author, author_token) = env.user("author");
    let (cook, token) = env.user("cook");
    let flour = env.ingredient("flour", "g");
    let bread = env.recipe(&author, "Bread", &[(flour, 100)]);
    let app = init_app!(env);

    for relation in ["favorite", "shopping_cart"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/recipes/{bread}/{relation}/"))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let delete = |auth: &str| {
        test::TestRequest::delete()
            .uri(&format!("/api/recipes/{bread}/"))
            .insert_header((header::AUTHORIZATION, auth.to_string()))
            .to_request()
    };

    let resp = test::call_service(&app, delete(&token)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(env.favorite_rows(cook.id, bread), 1);
    assert_eq!(env.cart_rows(cook.id), 1);

    let resp = test::call_service(&app, delete(&author_token)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(env.favorite_rows(cook.id, bread), 0);
    assert_eq!(env.cart_rows(cook.id), 0);
    {
        use foodgram::schema::recipe_ingredients;
        let mut conn = env.state.pool.get().unwrap();
        let line_items: i64 = recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(bread))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(line_items, 0);
    }

    let req = test::TestRequest::get().uri(&format!("/api/recipes/{bread}/")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/recipes/download_shopping_cart/")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "success");
}

#[actix_web::test]
async fn huge_page_window_is_served() {
    let env = test_env();
    env.user("cook");
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/users/?limit=9223372036854775807&offset=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["next"], Value::Null);
}
