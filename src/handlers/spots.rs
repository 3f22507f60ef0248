use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::entities::{review, spot, spot_image, user};
use crate::error::AppResult;
use crate::handlers::{deleted, find_spot, images_by_spot, DeletedResponse, UserSummary};
use crate::middleware::auth::{CurrentUser, MaybeUser};
use crate::middleware::validation::{IdPath, ValidatedJson, ValidatedQuery};
use crate::policy::{authorize, can_write_review, SPOT_NOT_OWNED};
use crate::utils::rating::{average_rating, preview_urls};
use crate::AppState;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_SIZE: u64 = 20;

// ============ Requests ============

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpotRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a street address."))]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a city."))]
    pub city: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a state."))]
    pub state: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a country."))]
    pub country: String,
    #[validate(
        required(message = "Latitude is not valid."),
        custom(function = "latitude")
    )]
    pub lat: Option<Value>,
    #[validate(
        required(message = "Longitude is not valid."),
        custom(function = "longitude")
    )]
    pub lng: Option<Value>,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Please provide a name."),
        custom(function = "name_within_limit")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a description."))]
    pub description: String,
    #[validate(
        required(message = "Please provide a price per day."),
        custom(function = "price_per_day")
    )]
    pub price: Option<Value>,
}

fn name_within_limit(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() > 50 {
        return Err(ValidationError::new("length")
            .with_message("Name must be less than 50 characters.".into()));
    }
    Ok(())
}

// Numbers are checked here rather than by serde, so a string or `null`
// in a numeric field is reported against that field.
fn number_within(
    value: &Value,
    min: f64,
    max: f64,
    message: &'static str,
) -> Result<(), ValidationError> {
    match value.as_f64() {
        Some(n) if n >= min && n <= max => Ok(()),
        _ => Err(ValidationError::new("range").with_message(message.into())),
    }
}

fn latitude(value: &Value) -> Result<(), ValidationError> {
    number_within(value, -90.0, 90.0, "Latitude is not valid.")
}

fn longitude(value: &Value) -> Result<(), ValidationError> {
    number_within(value, -180.0, 180.0, "Longitude is not valid.")
}

fn price_per_day(value: &Value) -> Result<(), ValidationError> {
    match value.as_f64() {
        Some(price) if price > 0.0 => Ok(()),
        _ => Err(ValidationError::new("range")
            .with_message("Please provide a price per day.".into())),
    }
}

fn as_number(value: Option<Value>) -> f64 {
    value.as_ref().and_then(Value::as_f64).unwrap_or_default()
}

impl SpotRequest {
    /// Copy the validated fields onto an active model.
    fn apply(self, active: &mut spot::ActiveModel) {
        active.address = Set(self.address);
        active.city = Set(self.city);
        active.state = Set(self.state);
        active.country = Set(self.country);
        active.lat = Set(as_number(self.lat));
        active.lng = Set(as_number(self.lng));
        active.name = Set(self.name);
        active.description = Set(self.description);
        active.price = Set(as_number(self.price));
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpotQuery {
    #[validate(range(min = 1, max = 10, message = "Page must be between 1 and 10"))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 20, message = "Size must be between 1 and 20"))]
    pub size: Option<u64>,
    #[validate(range(min = -90.0, max = 90.0, message = "Minimum latitude is invalid"))]
    pub min_lat: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0, message = "Maximum latitude is invalid"))]
    pub max_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Minimum longitude is invalid"))]
    pub min_lng: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Maximum longitude is invalid"))]
    pub max_lng: Option<f64>,
    #[validate(range(min = 0.0, message = "Minimum price must be greater than or equal to 0"))]
    pub min_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Maximum price must be greater than or equal to 0"))]
    pub max_price: Option<f64>,
}

impl SpotQuery {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(v) = self.min_lat {
            cond = cond.add(spot::Column::Lat.gte(v));
        }
        if let Some(v) = self.max_lat {
            cond = cond.add(spot::Column::Lat.lte(v));
        }
        if let Some(v) = self.min_lng {
            cond = cond.add(spot::Column::Lng.gte(v));
        }
        if let Some(v) = self.max_lng {
            cond = cond.add(spot::Column::Lng.lte(v));
        }
        if let Some(v) = self.min_price {
            cond = cond.add(spot::Column::Price.gte(v));
        }
        if let Some(v) = self.max_price {
            cond = cond.add(spot::Column::Price.lte(v));
        }
        cond
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SpotImageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide an image url."))]
    pub url: String,
    #[serde(default)]
    pub preview: bool,
}

// ============ Responses ============

/// A spot as shown in listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSummary {
    #[serde(flatten)]
    pub spot: spot::Model,
    pub avg_rating: f64,
    pub preview_image: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SpotListResponse {
    #[serde(rename = "Spots")]
    pub spots: Vec<SpotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SpotImageInfo {
    pub id: i32,
    pub url: String,
    pub preview: bool,
}

impl From<spot_image::Model> for SpotImageInfo {
    fn from(image: spot_image::Model) -> Self {
        Self {
            id: image.id,
            url: image.url,
            preview: image.preview,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotDetailResponse {
    #[serde(flatten)]
    pub spot: spot::Model,
    pub num_reviews: usize,
    pub avg_star_rating: f64,
    #[serde(rename = "SpotImages")]
    pub spot_images: Vec<SpotImageInfo>,
    #[serde(rename = "Owner")]
    pub owner: Option<UserSummary>,
    /// Whether the viewer may be offered the "write a review" action.
    pub viewer_can_review: bool,
}

/// Enrich spots with their rating and preview images.
async fn summarize(db: &DatabaseConnection, spots: Vec<spot::Model>) -> AppResult<Vec<SpotSummary>> {
    let ids: Vec<i32> = spots.iter().map(|s| s.id).collect();

    let reviews = review::Entity::find()
        .filter(review::Column::SpotId.is_in(ids.clone()))
        .all(db)
        .await?;
    let mut stars: HashMap<i32, Vec<i32>> = HashMap::new();
    for r in reviews {
        stars.entry(r.spot_id).or_default().push(r.stars);
    }

    let images = images_by_spot(db, ids).await?;

    Ok(spots
        .into_iter()
        .map(|spot| {
            let avg_rating = stars
                .get(&spot.id)
                .map(|s| average_rating(s))
                .unwrap_or(0.0);
            let preview_image = images
                .get(&spot.id)
                .map(|imgs| preview_urls(imgs))
                .unwrap_or_default();
            SpotSummary {
                spot,
                avg_rating,
                preview_image,
            }
        })
        .collect())
}

// ============ Handlers ============

/// List all spots, filtered and paginated
pub async fn list_spots(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<SpotQuery>,
) -> AppResult<Json<SpotListResponse>> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let size = query.size.unwrap_or(DEFAULT_SIZE);

    let spots = spot::Entity::find()
        .filter(query.condition())
        .order_by_asc(spot::Column::Id)
        .offset((page - 1) * size)
        .limit(size)
        .all(&state.db)
        .await?;

    Ok(Json(SpotListResponse {
        spots: summarize(&state.db, spots).await?,
        page: Some(page),
        size: Some(size),
    }))
}

/// List spots owned by the current user
pub async fn my_spots(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<SpotListResponse>> {
    let spots = spot::Entity::find()
        .filter(spot::Column::OwnerId.eq(user.id()))
        .order_by_asc(spot::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(SpotListResponse {
        spots: summarize(&state.db, spots).await?,
        page: None,
        size: None,
    }))
}

/// Get spot details
pub async fn get_spot(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
) -> AppResult<Json<SpotDetailResponse>> {
    let spot = find_spot(&state.db, spot_id).await?;

    let images = spot_image::Entity::find()
        .filter(spot_image::Column::SpotId.eq(spot.id))
        .order_by_asc(spot_image::Column::Id)
        .all(&state.db)
        .await?;
    let owner = user::Entity::find_by_id(spot.owner_id).one(&state.db).await?;
    let reviews = review::Entity::find()
        .filter(review::Column::SpotId.eq(spot.id))
        .all(&state.db)
        .await?;

    let stars: Vec<i32> = reviews.iter().map(|r| r.stars).collect();
    let viewer_can_review = can_write_review(
        viewer.id(),
        spot.owner_id,
        reviews.iter().map(|r| r.user_id),
    );

    Ok(Json(SpotDetailResponse {
        num_reviews: stars.len(),
        avg_star_rating: average_rating(&stars),
        spot_images: images.into_iter().map(SpotImageInfo::from).collect(),
        owner: owner.as_ref().map(UserSummary::from),
        viewer_can_review,
        spot,
    }))
}

/// Create a spot owned by the current user
pub async fn create_spot(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<SpotRequest>,
) -> AppResult<(StatusCode, Json<spot::Model>)> {
    let mut new_spot = spot::ActiveModel {
        owner_id: Set(user.id()),
        ..Default::default()
    };
    payload.apply(&mut new_spot);

    let spot = new_spot.insert(&state.db).await?;
    tracing::info!(spot_id = spot.id, owner_id = spot.owner_id, "Spot created");

    Ok((StatusCode::CREATED, Json(spot)))
}

/// Edit a spot
pub async fn update_spot(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
    ValidatedJson(payload): ValidatedJson<SpotRequest>,
) -> AppResult<Json<spot::Model>> {
    let spot = find_spot(&state.db, spot_id).await?;
    authorize(&spot, user.id(), SPOT_NOT_OWNED)?;

    let mut active: spot::ActiveModel = spot.into();
    payload.apply(&mut active);

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

/// Delete a spot along with its images, reviews and bookings
pub async fn delete_spot(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
) -> AppResult<Json<DeletedResponse>> {
    let spot = find_spot(&state.db, spot_id).await?;
    authorize(&spot, user.id(), SPOT_NOT_OWNED)?;

    spot::Entity::delete_by_id(spot.id).exec(&state.db).await?;
    tracing::info!(spot_id, "Spot deleted");

    Ok(deleted())
}

/// Add an image to a spot
pub async fn add_spot_image(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
    ValidatedJson(payload): ValidatedJson<SpotImageRequest>,
) -> AppResult<Json<SpotImageInfo>> {
    let spot = find_spot(&state.db, spot_id).await?;
    authorize(&spot, user.id(), SPOT_NOT_OWNED)?;

    let image = spot_image::ActiveModel {
        spot_id: Set(spot.id),
        url: Set(payload.url),
        preview: Set(payload.preview),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(SpotImageInfo::from(image)))
}
