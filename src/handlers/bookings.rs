use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{booking, spot, user};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::handlers::{
    deleted, find_booking, find_spot, spot_previews, DeletedResponse, SpotPreview, UserSummary,
};
use crate::middleware::auth::CurrentUser;
use crate::middleware::validation::{IdPath, ValidatedJson};
use crate::policy::{authorize, is_owner, BOOKING_NOT_OWNED};
use crate::utils::dates::{conflict_errors, validate_stay};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[validate(required(message = "Please provide a start date."))]
    pub start_date: Option<NaiveDate>,
    #[validate(required(message = "Please provide an end date."))]
    pub end_date: Option<NaiveDate>,
}

impl BookingRequest {
    fn dates(&self) -> (NaiveDate, NaiveDate) {
        (
            self.start_date.unwrap_or_default(),
            self.end_date.unwrap_or_default(),
        )
    }
}

/// A booking of someone else's spot: only the occupied dates are visible.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBooking {
    pub spot_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct OwnerBooking {
    #[serde(rename = "User")]
    pub user: Option<UserSummary>,
    #[serde(flatten)]
    pub booking: booking::Model,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SpotBooking {
    Owner(OwnerBooking),
    Public(PublicBooking),
}

#[derive(Debug, Serialize)]
pub struct SpotBookingsResponse {
    #[serde(rename = "Bookings")]
    pub bookings: Vec<SpotBooking>,
}

#[derive(Debug, Serialize)]
pub struct BookingWithSpot {
    #[serde(flatten)]
    pub booking: booking::Model,
    #[serde(rename = "Spot")]
    pub spot: Option<SpotPreview>,
}

#[derive(Debug, Serialize)]
pub struct MyBookingsResponse {
    #[serde(rename = "Bookings")]
    pub bookings: Vec<BookingWithSpot>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Reject a stay that is malformed or collides with another booking of the spot.
async fn check_availability(
    db: &DatabaseConnection,
    spot_id: i32,
    start: NaiveDate,
    end: NaiveDate,
    ignore_booking: Option<i32>,
) -> AppResult<()> {
    let invalid = validate_stay(start, end, today());
    if !invalid.is_empty() {
        return Err(AppError::Validation(invalid));
    }

    let mut query = booking::Entity::find().filter(booking::Column::SpotId.eq(spot_id));
    if let Some(id) = ignore_booking {
        query = query.filter(booking::Column::Id.ne(id));
    }

    let mut conflicts = FieldErrors::new();
    for existing in query.all(db).await? {
        conflicts.extend(conflict_errors(
            existing.start_date,
            existing.end_date,
            start,
            end,
        ));
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(AppError::BookingConflict(conflicts))
    }
}

/// List bookings of a spot; its owner also sees who booked
pub async fn spot_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
) -> AppResult<Json<SpotBookingsResponse>> {
    let spot = find_spot(&state.db, spot_id).await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::SpotId.eq(spot.id))
        .order_by_asc(booking::Column::StartDate)
        .all(&state.db)
        .await?;

    if !is_owner(&spot, user.id()) {
        let bookings = bookings
            .into_iter()
            .map(|b| {
                SpotBooking::Public(PublicBooking {
                    spot_id: b.spot_id,
                    start_date: b.start_date,
                    end_date: b.end_date,
                })
            })
            .collect();
        return Ok(Json(SpotBookingsResponse { bookings }));
    }

    let guest_ids: Vec<i32> = bookings.iter().map(|b| b.user_id).collect();
    let guests: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(guest_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let bookings = bookings
        .into_iter()
        .map(|b| {
            SpotBooking::Owner(OwnerBooking {
                user: guests.get(&b.user_id).map(UserSummary::from),
                booking: b,
            })
        })
        .collect();

    Ok(Json(SpotBookingsResponse { bookings }))
}

/// Book a spot for a date range
pub async fn create_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(spot_id, _): IdPath<spot::Entity>,
    ValidatedJson(payload): ValidatedJson<BookingRequest>,
) -> AppResult<(StatusCode, Json<booking::Model>)> {
    let spot = find_spot(&state.db, spot_id).await?;

    if is_owner(&spot, user.id()) {
        return Err(AppError::Forbidden(
            "Spot must not belong to the current user".to_string(),
        ));
    }

    let (start, end) = payload.dates();
    check_availability(&state.db, spot.id, start, end, None).await?;

    let booking = booking::ActiveModel {
        user_id: Set(user.id()),
        spot_id: Set(spot.id),
        start_date: Set(start),
        end_date: Set(end),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    tracing::info!(booking_id = booking.id, spot_id, user_id = user.id(), "Booking created");

    Ok((StatusCode::CREATED, Json(booking)))
}

/// List bookings made by the current user
pub async fn my_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<MyBookingsResponse>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(user.id()))
        .order_by_asc(booking::Column::StartDate)
        .all(&state.db)
        .await?;

    let spot_ids = bookings.iter().map(|b| b.spot_id).collect();
    let spots = spot_previews(&state.db, spot_ids).await?;

    let bookings = bookings
        .into_iter()
        .map(|b| BookingWithSpot {
            spot: spots.get(&b.spot_id).cloned(),
            booking: b,
        })
        .collect();

    Ok(Json(MyBookingsResponse { bookings }))
}

/// Move a booking to new dates
pub async fn update_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(booking_id, _): IdPath<booking::Entity>,
    ValidatedJson(payload): ValidatedJson<BookingRequest>,
) -> AppResult<Json<booking::Model>> {
    let booking = find_booking(&state.db, booking_id).await?;
    authorize(&booking, user.id(), BOOKING_NOT_OWNED)?;

    if booking.end_date < today() {
        return Err(AppError::Forbidden(
            "Past bookings can't be modified".to_string(),
        ));
    }

    let (start, end) = payload.dates();
    check_availability(&state.db, booking.spot_id, start, end, Some(booking.id)).await?;

    let mut active: booking::ActiveModel = booking.into();
    active.start_date = Set(start);
    active.end_date = Set(end);

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

/// Cancel a booking; allowed for the guest and for the spot's owner
pub async fn delete_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(booking_id, _): IdPath<booking::Entity>,
) -> AppResult<Json<DeletedResponse>> {
    let booking = find_booking(&state.db, booking_id).await?;
    let spot = find_spot(&state.db, booking.spot_id).await?;

    if !is_owner(&booking, user.id()) && !is_owner(&spot, user.id()) {
        return Err(AppError::Forbidden(
            "Booking must belong to the current user or the Spot must belong to the current user"
                .to_string(),
        ));
    }

    if booking.start_date <= today() {
        return Err(AppError::Forbidden(
            "Bookings that have been started can't be deleted".to_string(),
        ));
    }

    booking::Entity::delete_by_id(booking.id).exec(&state.db).await?;
    tracing::info!(booking_id, "Booking deleted");

    Ok(deleted())
}
