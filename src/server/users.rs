use super::auth::CurrentUser;
use super::recipes::RecipeSummary;
use super::{error::AppError, query, run_query, AppState};
use crate::database::models::{User, UserId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: usize,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = run_query(&state, move |conn| {
        query::create_user(
            conn,
            query::NewUser {
                username: payload.username,
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
            },
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::new(user, false))))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let viewer = viewer.map(|c| c.0);
    let (all, following) = run_query(&state, move |conn| {
        let all = query::list_users(conn)?;
        let following = match viewer {
            Some(v) => query::followed_author_ids(conn, v)?,
            None => HashSet::new(),
        };
        Ok((all, following))
    })
    .await?;
    Ok(Json(
        all.into_iter()
            .map(|u| {
                let is_subscribed = following.contains(&u.id);
                UserResponse::new(u, is_subscribed)
            })
            .collect(),
    ))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserResponse>, AppError> {
    let viewer = viewer.map(|c| c.0);
    let (user, is_subscribed) = run_query(&state, move |conn| {
        let user = query::get_user(conn, user_id)?;
        let is_subscribed = match viewer {
            Some(v) => query::followed_author_ids(conn, v)?.contains(&user_id),
            None => false,
        };
        Ok((user, is_subscribed))
    })
    .await?;
    Ok(Json(UserResponse::new(user, is_subscribed)))
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let author = run_query(&state, move |conn| {
        query::follow_author(conn, viewer, user_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::new(author, true))))
}

pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    run_query(&state, move |conn| {
        query::unfollow_author(conn, viewer, user_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscriptions(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
) -> Result<Json<Vec<SubscriptionResponse>>, AppError> {
    let rows = run_query(&state, move |conn| {
        let authors = query::followed_authors(conn, viewer)?;
        authors
            .into_iter()
            .map(|author| {
                let handles = query::recipe_handles_by_author(conn, author.id)?;
                Ok((author, handles))
            })
            .collect::<Result<Vec<_>, AppError>>()
    })
    .await?;
    Ok(Json(
        rows.into_iter()
            .map(|(author, handles)| SubscriptionResponse {
                user: UserResponse::new(author, true),
                recipes_count: handles.len(),
                recipes: handles.into_iter().map(Into::into).collect(),
            })
            .collect(),
    ))
}
