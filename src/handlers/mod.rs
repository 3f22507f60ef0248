pub mod auth;
pub mod bookings;
pub mod images;
pub mod reviews;
pub mod spots;

use std::collections::HashMap;

use axum::{http::StatusCode, Json};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::entities::{booking, review, spot, spot_image, user};
use crate::error::{AppError, AppResult};
use crate::policy::{BOOKING_NOT_FOUND, REVIEW_NOT_FOUND, SPOT_NOT_FOUND};
use crate::utils::rating::preview_urls;

/// Public part of a user shown next to their spots and reviews.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// A spot embedded in another resource, with its preview image URLs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPreview {
    #[serde(flatten)]
    pub spot: spot::Model,
    pub preview_image: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub message: &'static str,
    pub status_code: u16,
}

pub fn deleted() -> Json<DeletedResponse> {
    Json(DeletedResponse {
        message: "Successfully deleted",
        status_code: StatusCode::OK.as_u16(),
    })
}

pub async fn find_spot(db: &DatabaseConnection, spot_id: i32) -> AppResult<spot::Model> {
    spot::Entity::find_by_id(spot_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(SPOT_NOT_FOUND.to_string()))
}

pub async fn find_review(db: &DatabaseConnection, review_id: i32) -> AppResult<review::Model> {
    review::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))
}

pub async fn find_booking(db: &DatabaseConnection, booking_id: i32) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(BOOKING_NOT_FOUND.to_string()))
}

/// Images of the given spots, grouped by spot id, in id order.
pub async fn images_by_spot(
    db: &DatabaseConnection,
    spot_ids: Vec<i32>,
) -> AppResult<HashMap<i32, Vec<spot_image::Model>>> {
    let images = spot_image::Entity::find()
        .filter(spot_image::Column::SpotId.is_in(spot_ids))
        .order_by_asc(spot_image::Column::Id)
        .all(db)
        .await?;

    let mut grouped: HashMap<i32, Vec<spot_image::Model>> = HashMap::new();
    for image in images {
        grouped.entry(image.spot_id).or_default().push(image);
    }
    Ok(grouped)
}

/// Attach preview image URLs to each spot, keyed by spot id.
pub async fn spot_previews(
    db: &DatabaseConnection,
    spot_ids: Vec<i32>,
) -> AppResult<HashMap<i32, SpotPreview>> {
    let spots = spot::Entity::find()
        .filter(spot::Column::Id.is_in(spot_ids.clone()))
        .all(db)
        .await?;
    let images = images_by_spot(db, spot_ids).await?;

    Ok(spots
        .into_iter()
        .map(|spot| {
            let preview_image = images
                .get(&spot.id)
                .map(|imgs| preview_urls(imgs))
                .unwrap_or_default();
            (spot.id, SpotPreview { spot, preview_image })
        })
        .collect())
}
