use super::{error::AppError, query, run_query, AppState};
use crate::database::models::{Ingredient, IngredientId};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct IngredientListQuery {
    search: Option<String>,
}

#[derive(Serialize)]
pub struct IngredientResponse {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngredientListQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let ingredients = run_query(&state, move |conn| {
        query::list_ingredients(conn, params.search.as_deref())
    })
    .await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(ingredient_id): Path<IngredientId>,
) -> Result<Json<IngredientResponse>, AppError> {
    let ingredient = run_query(&state, move |conn| query::get_ingredient(conn, ingredient_id)).await?;
    Ok(Json(ingredient.into()))
}
