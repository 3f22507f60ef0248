//! Ownership rules shared by every mutating route.
//!
//! Routes follow one order: load the resource (404), then [`authorize`]
//! (403), then any business rule, then write.

use crate::entities::{booking, review, review_image, spot, spot_image};
use crate::error::{AppError, AppResult};

pub const SPOT_NOT_FOUND: &str = "Spot couldn't be found";
pub const SPOT_NOT_OWNED: &str = "Spot does not belong to current user";
pub const REVIEW_NOT_FOUND: &str = "Review couldn't be found";
pub const REVIEW_NOT_OWNED: &str = "Review must belong to the current user";
pub const BOOKING_NOT_FOUND: &str = "Booking couldn't be found";
pub const BOOKING_NOT_OWNED: &str = "Booking must belong to the current user";
pub const SPOT_IMAGE_NOT_FOUND: &str = "Spot Image couldn't be found";
pub const REVIEW_IMAGE_NOT_FOUND: &str = "Review Image couldn't be found";

/// A row that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> i32;
}

impl Owned for spot::Model {
    fn owner_id(&self) -> i32 {
        self.owner_id
    }
}

impl Owned for review::Model {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

impl Owned for booking::Model {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

/// A table addressed by id in a route path.
pub trait Resource {
    /// Message for an id that matches no row.
    const NOT_FOUND: &'static str;
}

impl Resource for spot::Entity {
    const NOT_FOUND: &'static str = SPOT_NOT_FOUND;
}

impl Resource for review::Entity {
    const NOT_FOUND: &'static str = REVIEW_NOT_FOUND;
}

impl Resource for booking::Entity {
    const NOT_FOUND: &'static str = BOOKING_NOT_FOUND;
}

impl Resource for spot_image::Entity {
    const NOT_FOUND: &'static str = SPOT_IMAGE_NOT_FOUND;
}

impl Resource for review_image::Entity {
    const NOT_FOUND: &'static str = REVIEW_IMAGE_NOT_FOUND;
}

pub fn is_owner<R: Owned>(resource: &R, actor_id: i32) -> bool {
    resource.owner_id() == actor_id
}

/// Fails with 403 and `message` unless `actor_id` owns `resource`.
pub fn authorize<R: Owned>(resource: &R, actor_id: i32, message: &str) -> AppResult<()> {
    if is_owner(resource, actor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}

/// Whether to offer the "write a review" action to a viewer.
///
/// Advisory only: the review route enforces uniqueness on its own.
pub fn can_write_review<I>(viewer_id: Option<i32>, spot_owner_id: i32, reviewer_ids: I) -> bool
where
    I: IntoIterator<Item = i32>,
{
    match viewer_id {
        None => false,
        Some(id) if id == spot_owner_id => false,
        Some(id) => reviewer_ids.into_iter().all(|reviewer| reviewer != id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn spot_owned_by(owner_id: i32) -> spot::Model {
        let now = Utc::now();
        spot::Model {
            id: 1,
            owner_id,
            address: "123 Disney Lane".into(),
            city: "San Francisco".into(),
            state: "California".into(),
            country: "United States of America".into(),
            lat: 37.7645358,
            lng: -122.4730327,
            name: "App Academy".into(),
            description: "Place where web developers are created".into(),
            price: 123.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_authorize_owner() {
        let spot = spot_owned_by(3);
        assert!(authorize(&spot, 3, SPOT_NOT_OWNED).is_ok());
    }

    #[test]
    fn test_authorize_rejects_other_user() {
        let spot = spot_owned_by(3);
        match authorize(&spot, 4, SPOT_NOT_OWNED) {
            Err(AppError::Forbidden(message)) => assert_eq!(message, SPOT_NOT_OWNED),
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_review_cta_visibility() {
        // anonymous
        assert!(!can_write_review(None, 1, vec![]));
        // owner
        assert!(!can_write_review(Some(1), 1, vec![]));
        // already reviewed
        assert!(!can_write_review(Some(2), 1, vec![5, 2]));
        assert!(can_write_review(Some(2), 1, vec![5, 6]));
    }
}
