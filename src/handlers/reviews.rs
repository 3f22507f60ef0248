use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::entities::{review, review_image, spot, user};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    deleted, find_review, find_spot, spot_previews, DeletedResponse, SpotPreview, UserSummary,
};
use crate::middleware::auth::CurrentUser;
use crate::middleware::validation::{IdPath, ValidatedJson};
use crate::policy::{authorize, REVIEW_NOT_OWNED};
use crate::AppState;

/// Most images a single review may carry.
pub const MAX_REVIEW_IMAGES: u64 = 10;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide review text."))]
    pub review: String,
    #[validate(
        required(message = "Stars must be an integer from 1 to 5."),
        custom(function = "star_rating")
    )]
    pub stars: Option<Value>,
}

/// Stars arrive as raw JSON so `4.5` or `"five"` fail here with the field message.
fn star_rating(value: &Value) -> Result<(), ValidationError> {
    match value.as_i64() {
        Some(stars) if (1..=5).contains(&stars) => Ok(()),
        _ => Err(ValidationError::new("stars")
            .with_message("Stars must be an integer from 1 to 5.".into())),
    }
}

impl ReviewRequest {
    fn stars(&self) -> i32 {
        self.stars
            .as_ref()
            .and_then(Value::as_i64)
            .and_then(|stars| i32::try_from(stars).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewImageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide an image url."))]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewImageInfo {
    pub id: i32,
    pub url: String,
}

impl From<review_image::Model> for ReviewImageInfo {
    fn from(image: review_image::Model) -> Self {
        Self {
            id: image.id,
            url: image.url,
        }
    }
}

/// A review with its author and images.
#[derive(Debug, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: review::Model,
    #[serde(rename = "User")]
    pub user: Option<UserSummary>,
    #[serde(rename = "Spot", skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotPreview>,
    #[serde(rename = "ReviewImages")]
    pub review_images: Vec<ReviewImageInfo>,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    #[serde(rename = "Reviews")]
    pub reviews: Vec<ReviewDetail>,
}

/// Load authors and images for a batch of reviews; optionally the reviewed spots too.
async fn detail_reviews(
    db: &DatabaseConnection,
    reviews: Vec<review::Model>,
    with_spot: bool,
) -> AppResult<Vec<ReviewDetail>> {
    let review_ids: Vec<i32> = reviews.iter().map(|r| r.id).collect();
    let user_ids: Vec<i32> = reviews.iter().map(|r| r.user_id).collect();

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut images: HashMap<i32, Vec<ReviewImageInfo>> = HashMap::new();
    for image in review_image::Entity::find()
        .filter(review_image::Column::ReviewId.is_in(review_ids))
        .order_by_asc(review_image::Column::Id)
        .all(db)
        .await?
    {
        images.entry(image.review_id).or_default().push(image.into());
    }

    let mut spots = if with_spot {
        spot_previews(db, reviews.iter().map(|r| r.spot_id).collect()).await?
    } else {
        HashMap::new()
    };

    Ok(reviews
        .into_iter()
        .map(|review| ReviewDetail {
            user: users.get(&review.user_id).map(UserSummary::from),
            // A user reviews a spot at most once, so each preview is taken once.
            spot: spots.remove(&review.spot_id),
            review_images: images.remove(&review.id).unwrap_or_default(),
            review,
        })
        .collect())
}

/// Map a failed review insert; a `(user_id, spot_id)` index violation is a duplicate review.
pub fn review_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateReview,
        _ => AppError::Database(err),
    }
}

/// List reviews of a spot
pub async fn spot_reviews(
    State(state): State<AppState>,
    IdPath(spot_id, _): IdPath<spot::Entity>,
) -> AppResult<Json<ReviewListResponse>> {
    let spot = find_spot(&state.db, spot_id).await?;

    let reviews = review::Entity::find()
        .filter(review::Column::SpotId.eq(spot.id))
        .order_by_asc(review::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(ReviewListResponse {
        reviews: detail_reviews(&state.db, reviews, false).await?,
    }))
}

/// Create a review for a spot; one per user and spot
pub async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
    ValidatedJson(payload): ValidatedJson<ReviewRequest>,
) -> AppResult<(StatusCode, Json<review::Model>)> {
    let spot = find_spot(&state.db, spot_id).await?;

    let existing = review::Entity::find()
        .filter(review::Column::SpotId.eq(spot.id))
        .filter(review::Column::UserId.eq(user.id()))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::DuplicateReview);
    }

    let new_review = review::ActiveModel {
        user_id: Set(user.id()),
        spot_id: Set(spot.id),
        stars: Set(payload.stars()),
        review: Set(payload.review),
        ..Default::default()
    };

    // The unique index catches a concurrent insert that passed the check above.
    let review = new_review
        .insert(&state.db)
        .await
        .map_err(review_insert_error)?;
    tracing::info!(review_id = review.id, spot_id, user_id = user.id(), "Review created");

    Ok((StatusCode::CREATED, Json(review)))
}

/// List reviews written by the current user
pub async fn my_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ReviewListResponse>> {
    let reviews = review::Entity::find()
        .filter(review::Column::UserId.eq(user.id()))
        .order_by_asc(review::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(ReviewListResponse {
        reviews: detail_reviews(&state.db, reviews, true).await?,
    }))
}

/// Edit a review
pub async fn update_review(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(review_id, _): IdPath<review::Entity>,
    ValidatedJson(payload): ValidatedJson<ReviewRequest>,
) -> AppResult<Json<review::Model>> {
    let review = find_review(&state.db, review_id).await?;
    authorize(&review, user.id(), REVIEW_NOT_OWNED)?;

    let mut active: review::ActiveModel = review.into();
    active.stars = Set(payload.stars());
    active.review = Set(payload.review);

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

/// Delete a review and its images
pub async fn delete_review(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(review_id, _): IdPath<review::Entity>,
) -> AppResult<Json<DeletedResponse>> {
    let review = find_review(&state.db, review_id).await?;
    authorize(&review, user.id(), REVIEW_NOT_OWNED)?;

    let txn = state.db.begin().await?;
    review_image::Entity::delete_many()
        .filter(review_image::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    review::Entity::delete_by_id(review.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(review_id, "Review deleted");
    Ok(deleted())
}

/// Attach an image to a review
pub async fn add_review_image(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(review_id, _): IdPath<review::Entity>,
    ValidatedJson(payload): ValidatedJson<ReviewImageRequest>,
) -> AppResult<Json<ReviewImageInfo>> {
    let review = find_review(&state.db, review_id).await?;
    authorize(&review, user.id(), REVIEW_NOT_OWNED)?;

    let count = review_image::Entity::find()
        .filter(review_image::Column::ReviewId.eq(review.id))
        .count(&state.db)
        .await?;

    if count >= MAX_REVIEW_IMAGES {
        return Err(AppError::Forbidden(
            "Maximum number of images for this resource was reached".to_string(),
        ));
    }

    let image = review_image::ActiveModel {
        review_id: Set(review.id),
        url: Set(payload.url),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(image.into()))
}
