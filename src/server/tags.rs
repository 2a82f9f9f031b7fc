use super::{error::AppError, query, run_query, AppState};
use crate::database::models::{Tag, TagId};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct TagResponse {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = run_query(&state, query::list_tags).await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(tag_id): Path<TagId>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = run_query(&state, move |conn| query::get_tag(conn, tag_id)).await?;
    Ok(Json(tag.into()))
}
