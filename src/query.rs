//! Diesel queries, one submodule per table group. Everything here is blocking
//! and runs on a pooled connection inside `web::block`.

pub mod ingredients;
pub mod membership;
pub mod recipes;
pub mod users;
