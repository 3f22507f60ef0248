use axum::{
    extract::State,
    Json,
};
use sea_orm::EntityTrait;

use crate::entities::{review_image, spot_image};
use crate::error::{AppError, AppResult};
use crate::handlers::{deleted, find_review, find_spot, DeletedResponse};
use crate::middleware::auth::CurrentUser;
use crate::middleware::validation::IdPath;
use crate::policy::{
    authorize, REVIEW_IMAGE_NOT_FOUND, REVIEW_NOT_OWNED, SPOT_IMAGE_NOT_FOUND, SPOT_NOT_OWNED,
};
use crate::AppState;

/// Delete an image of a spot owned by the current user
pub async fn delete_spot_image(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(image_id, _): IdPath<spot_image::Entity>,
) -> AppResult<Json<DeletedResponse>> {
    let image = spot_image::Entity::find_by_id(image_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(SPOT_IMAGE_NOT_FOUND.to_string()))?;

    let spot = find_spot(&state.db, image.spot_id).await?;
    authorize(&spot, user.id(), SPOT_NOT_OWNED)?;

    spot_image::Entity::delete_by_id(image.id).exec(&state.db).await?;
    Ok(deleted())
}

/// Delete an image of a review written by the current user
pub async fn delete_review_image(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(image_id, _): IdPath<review_image::Entity>,
) -> AppResult<Json<DeletedResponse>> {
    let image = review_image::Entity::find_by_id(image_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(REVIEW_IMAGE_NOT_FOUND.to_string()))?;

    let review = find_review(&state.db, image.review_id).await?;
    authorize(&review, user.id(), REVIEW_NOT_OWNED)?;

    review_image::Entity::delete_by_id(image.id).exec(&state.db).await?;
    Ok(deleted())
}
