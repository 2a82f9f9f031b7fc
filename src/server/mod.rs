// Copyright 2023 Remi Bernotavicius

use crate::database;
use axum::{routing::get, Router};
use error::AppError;
use std::sync::Arc;

pub mod auth;
pub mod error;
pub mod ingredients;
pub mod query;
pub mod recipes;
pub mod tags;
pub mod users;
pub mod wishlist;

pub struct AppState {
    pub pool: database::Pool,
}

/// diesel is synchronous; queries run on the blocking thread-pool with a
/// pooled connection.
pub(crate) async fn run_query<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut database::Connection) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tags/", get(tags::list))
        .route("/tags/:tag_id/", get(tags::detail))
        .route("/ingredients/", get(ingredients::list))
        .route("/ingredients/:ingredient_id/", get(ingredients::detail))
        .route("/recipes/", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/:recipe_id/",
            get(recipes::detail)
                .patch(recipes::update)
                .delete(recipes::delete),
        )
        .route(
            "/recipes/:recipe_id/favorite/",
            get(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/:recipe_id/shopping_cart/",
            get(recipes::add_to_shopping_cart).delete(recipes::remove_from_shopping_cart),
        )
        .route("/users/", get(users::list).post(users::create))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route("/users/:user_id/", get(users::detail))
        .route(
            "/users/:user_id/subscribe/",
            get(users::subscribe).delete(users::unsubscribe),
        )
        .with_state(state)
}

pub async fn serve(pool: database::Pool, port: u16) -> crate::Result<()> {
    let state = Arc::new(AppState { pool });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
