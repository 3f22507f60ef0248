use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, bookings, images, reviews, spots};
use crate::middleware::rate_limit::{log_request, GlobalGovernorLayer};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Session and account routes
    let session_routes = Router::new().route(
        "/",
        get(auth::restore_session)
            .post(auth::login)
            .delete(auth::logout),
    );

    let user_routes = Router::new().route("/", post(auth::signup));

    // Spot routes; handlers that need a session ask for one in their signature
    let spot_routes = Router::new()
        .route("/", get(spots::list_spots).post(spots::create_spot))
        .route("/current", get(spots::my_spots))
        .route(
            "/{spot_id}",
            get(spots::get_spot)
                .put(spots::update_spot)
                .delete(spots::delete_spot),
        )
        .route("/{spot_id}/images", post(spots::add_spot_image))
        .route(
            "/{spot_id}/reviews",
            get(reviews::spot_reviews).post(reviews::create_review),
        )
        .route(
            "/{spot_id}/bookings",
            get(bookings::spot_bookings).post(bookings::create_booking),
        );

    let review_routes = Router::new()
        .route("/current", get(reviews::my_reviews))
        .route(
            "/{review_id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/{review_id}/images", post(reviews::add_review_image));

    let booking_routes = Router::new()
        .route("/current", get(bookings::my_bookings))
        .route(
            "/{booking_id}",
            put(bookings::update_booking).delete(bookings::delete_booking),
        );

    let spot_image_routes =
        Router::new().route("/{image_id}", delete(images::delete_spot_image));

    let review_image_routes =
        Router::new().route("/{image_id}", delete(images::delete_review_image));

    // Combine all routes
    Router::new()
        .nest("/api/session", session_routes)
        .nest("/api/users", user_routes)
        .nest("/api/spots", spot_routes)
        .nest("/api/reviews", review_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/spot-images", spot_image_routes)
        .nest("/api/review-images", review_image_routes)
        .with_state(state)
}

/// Wrap the API in the serving middleware. Outermost first: request log,
/// rate limit, CORS, tracing.
pub fn with_middleware(router: Router, governor: GlobalGovernorLayer) -> Router {
    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(governor)
        .layer(middleware::from_fn(log_request))
}
