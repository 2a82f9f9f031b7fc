use super::auth::CurrentUser;
use super::tags::TagResponse;
use super::users::UserResponse;
use super::{error::AppError, query, run_query, wishlist, AppState};
use crate::database;
use crate::database::models::{IngredientId, Recipe, RecipeHandle, RecipeId, TagId, UserId};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct IngredientAmount {
    pub id: IngredientId,
    pub amount: i32,
}

#[derive(Deserialize)]
pub struct CreateRecipePayload {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

#[derive(Deserialize)]
pub struct UpdateRecipePayload {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<TagId>>,
}

#[derive(Deserialize)]
pub struct RecipeListQuery {
    pub author: Option<i32>,
    pub tag: Option<String>,
    pub is_favorited: Option<u8>,
    pub is_in_shopping_cart: Option<u8>,
}

#[derive(Serialize)]
pub struct IngredientAmountResponse {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize)]
pub struct RecipeResponse {
    pub id: RecipeId,
    pub author: UserResponse,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: chrono::NaiveDateTime,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<IngredientAmountResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Compact card shown by the toggle endpoints and subscription lists.
#[derive(Serialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<RecipeHandle> for RecipeSummary {
    fn from(handle: RecipeHandle) -> Self {
        Self {
            id: handle.id,
            name: handle.name,
            image: handle.image,
            cooking_time: handle.cooking_time,
        }
    }
}

fn ingredient_entries(payload: &[IngredientAmount]) -> Vec<(IngredientId, i32)> {
    payload.iter().map(|e| (e.id, e.amount)).collect()
}

fn assemble(
    conn: &mut database::Connection,
    recipe_list: Vec<Recipe>,
    viewer: Option<UserId>,
) -> Result<Vec<RecipeResponse>, AppError> {
    let ids: Vec<RecipeId> = recipe_list.iter().map(|r| r.id).collect();
    let mut ingredient_rows = query::recipe_ingredient_rows(conn, &ids)?;
    let mut tag_rows = query::recipe_tag_rows(conn, &ids)?;
    let authors = query::users_by_ids(conn, recipe_list.iter().map(|r| r.author_id).collect())?;

    let (favorited, in_cart, following) = match viewer {
        Some(v) => (
            query::favorite_recipe_ids(conn, v)?,
            query::shopping_list_recipe_ids(conn, v)?,
            query::followed_author_ids(conn, v)?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipe_list
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or(AppError::NotFound("user"))?;
            let is_subscribed = following.contains(&recipe.author_id);
            Ok(RecipeResponse {
                id: recipe.id,
                author: UserResponse::new(author, is_subscribed),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
                tags: tag_rows
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                ingredients: ingredient_rows
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(row, ingredient)| IngredientAmountResponse {
                        id: row.ingredient_id,
                        name: ingredient.name,
                        measurement_unit: ingredient.measurement_unit,
                        amount: row.amount,
                    })
                    .collect(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
            })
        })
        .collect()
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Query(params): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let viewer = viewer.map(|c| c.0);

    let favorited_by = match params.is_favorited {
        Some(flag) if flag != 0 => Some(viewer.ok_or(AppError::Unauthorized)?),
        _ => None,
    };
    let in_shopping_list_of = match params.is_in_shopping_cart {
        Some(flag) if flag != 0 => Some(viewer.ok_or(AppError::Unauthorized)?),
        _ => None,
    };
    let filter = query::RecipeFilter {
        author: params.author.map(UserId::new),
        tag: params.tag,
        favorited_by,
        in_shopping_list_of,
    };

    let responses = run_query(&state, move |conn| {
        let recipe_list = query::list_recipes(conn, &filter)?;
        assemble(conn, recipe_list, viewer)
    })
    .await?;
    Ok(Json(responses))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(recipe_id): Path<RecipeId>,
) -> Result<Json<RecipeResponse>, AppError> {
    let viewer = viewer.map(|c| c.0);
    let mut responses = run_query(&state, move |conn| {
        let recipe = query::get_recipe(conn, recipe_id)?;
        assemble(conn, vec![recipe], viewer)
    })
    .await?;
    responses.pop().map(Json).ok_or(AppError::NotFound("recipe"))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(author): CurrentUser,
    Json(payload): Json<CreateRecipePayload>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let mut responses = run_query(&state, move |conn| {
        let recipe = query::create_recipe(
            conn,
            author,
            query::NewRecipe {
                name: payload.name,
                image: payload.image,
                text: payload.text,
                cooking_time: payload.cooking_time,
                ingredients: ingredient_entries(&payload.ingredients),
                tags: payload.tags,
            },
        )?;
        assemble(conn, vec![recipe], Some(author))
    })
    .await?;
    let response = responses.pop().ok_or(AppError::NotFound("recipe"))?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(editor): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
    Json(payload): Json<UpdateRecipePayload>,
) -> Result<Json<RecipeResponse>, AppError> {
    let mut responses = run_query(&state, move |conn| {
        let recipe = query::update_recipe(
            conn,
            editor,
            recipe_id,
            query::RecipeChanges {
                name: payload.name,
                image: payload.image,
                text: payload.text,
                cooking_time: payload.cooking_time,
                ingredients: payload.ingredients.as_deref().map(ingredient_entries),
                tags: payload.tags,
            },
        )?;
        assemble(conn, vec![recipe], Some(editor))
    })
    .await?;
    responses.pop().map(Json).ok_or(AppError::NotFound("recipe"))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(editor): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
) -> Result<StatusCode, AppError> {
    run_query(&state, move |conn| {
        query::delete_recipe(conn, editor, recipe_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeSummary>), AppError> {
    let handle = run_query(&state, move |conn| {
        query::add_favorite(conn, viewer, recipe_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(handle.into())))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
) -> Result<StatusCode, AppError> {
    run_query(&state, move |conn| {
        query::remove_favorite(conn, viewer, recipe_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeSummary>), AppError> {
    let handle = run_query(&state, move |conn| {
        query::add_to_shopping_list(conn, viewer, recipe_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(handle.into())))
}

pub async fn remove_from_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(recipe_id): Path<RecipeId>,
) -> Result<StatusCode, AppError> {
    run_query(&state, move |conn| {
        query::remove_from_shopping_list(conn, viewer, recipe_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let rows = run_query(&state, move |conn| {
        query::shopping_list_ingredient_rows(conn, viewer)
    })
    .await?;
    let body = wishlist::render(&wishlist::aggregate(rows));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", wishlist::FILENAME),
            ),
        ],
        body,
    ))
}
