mod common;

use axum::http::StatusCode;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;

use common::TestApp;
use spots_backend::entities::{review, review_image};
use spots_backend::handlers::reviews::review_insert_error;

#[tokio::test]
async fn test_one_review_per_user_and_spot() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (guest_id, guest) = app.user("guest").await;
    let (_, other) = app.user("other").await;
    let spot_id = app.spot(&owner, "App Academy").await;
    let uri = format!("/api/spots/{}/reviews", spot_id);
    let body = json!({ "review": "Great stay", "stars": 5 });

    let res = app.post(&uri, Some(&guest), body.clone()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["stars"], 5);
    assert_eq!(res.body["userId"].as_i64(), Some(guest_id as i64));
    assert_eq!(res.body["spotId"].as_i64(), Some(spot_id));

    let res = app.post(&uri, Some(&guest), body.clone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["title"], "User already has a review for this spot");

    let res = app
        .post(&uri, Some(&other), json!({ "review": "Nice", "stars": 4 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["stars"], 4);
}

#[tokio::test]
async fn test_ratings_are_exact_averages() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let spot_id = app.spot(&owner, "App Academy").await;
    let uri = format!("/api/spots/{}/reviews", spot_id);

    for (name, stars) in [("a", 5), ("b", 4), ("c", 4)] {
        let (_, token) = app.user(name).await;
        let res = app
            .post(&uri, Some(&token), json!({ "review": "ok", "stars": stars }))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let expected = 13.0 / 3.0;
    let res = app.get(&format!("/api/spots/{}", spot_id), None).await;
    assert_eq!(res.body["numReviews"], 3);
    assert_eq!(res.body["avgStarRating"].as_f64(), Some(expected));

    let res = app.get("/api/spots", None).await;
    assert_eq!(res.body["Spots"][0]["avgRating"].as_f64(), Some(expected));

    let res = app.get(&uri, None).await;
    let reviews = res.body["Reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 3);
    assert_eq!(reviews[0]["User"]["firstName"], "a");
    assert_eq!(reviews[0]["ReviewImages"], json!([]));
}

#[tokio::test]
async fn test_review_prompt_visibility() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, reviewer) = app.user("reviewer").await;
    let (_, newcomer) = app.user("newcomer").await;
    let spot_id = app.spot(&owner, "App Academy").await;
    app.post(
        &format!("/api/spots/{}/reviews", spot_id),
        Some(&reviewer),
        json!({ "review": "Great stay", "stars": 5 }),
    )
    .await;

    let uri = format!("/api/spots/{}", spot_id);
    assert_eq!(app.get(&uri, Some(&owner)).await.body["viewerCanReview"], false);
    assert_eq!(app.get(&uri, Some(&reviewer)).await.body["viewerCanReview"], false);
    assert_eq!(app.get(&uri, Some(&newcomer)).await.body["viewerCanReview"], true);
    assert_eq!(app.get(&uri, None).await.body["viewerCanReview"], false);
}

#[tokio::test]
async fn test_review_validation() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, guest) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await;

    let res = app
        .post(
            &format!("/api/spots/{}/reviews", spot_id),
            Some(&guest),
            json!({ "review": "", "stars": 6 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["errors"]["review"], "Please provide review text.");
    assert_eq!(res.body["errors"]["stars"], "Stars must be an integer from 1 to 5.");
}

#[tokio::test]
async fn test_edit_and_delete_review_with_images() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, guest) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await;

    let res = app
        .post(
            &format!("/api/spots/{}/reviews", spot_id),
            Some(&guest),
            json!({ "review": "Great stay", "stars": 5 }),
        )
        .await;
    let review_id = res.body["id"].as_i64().unwrap();
    let uri = format!("/api/reviews/{}", review_id);

    let res = app
        .post(&format!("{}/images", uri), Some(&guest), json!({ "url": "pic.jpg" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["url"], "pic.jpg");

    let res = app
        .put(&uri, Some(&owner), json!({ "review": "Hijacked", "stars": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Review must belong to the current user");

    let res = app
        .put(&uri, Some(&guest), json!({ "review": "Even better", "stars": 4 }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["review"], "Even better");

    let res = app.get("/api/reviews/current", Some(&guest)).await;
    let mine = &res.body["Reviews"][0];
    assert_eq!(mine["Spot"]["name"], "App Academy");
    assert_eq!(mine["ReviewImages"][0]["url"], "pic.jpg");

    let res = app.delete(&uri, Some(&guest)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Successfully deleted");

    let remaining = review_image::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(remaining, 0);

    let res = app.delete(&uri, Some(&guest)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Review couldn't be found");
}

#[tokio::test]
async fn test_review_image_limit() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, guest) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await;

    let res = app
        .post(
            &format!("/api/spots/{}/reviews", spot_id),
            Some(&guest),
            json!({ "review": "Great stay", "stars": 5 }),
        )
        .await;
    let images = format!("/api/reviews/{}/images", res.body["id"]);

    for i in 0..10 {
        let res = app
            .post(&images, Some(&guest), json!({ "url": format!("{}.jpg", i) }))
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    let res = app
        .post(&images, Some(&guest), json!({ "url": "one-too-many.jpg" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        res.body["message"],
        "Maximum number of images for this resource was reached"
    );
}

#[tokio::test]
async fn test_delete_images() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, guest) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await;

    let res = app
        .post(
            &format!("/api/spots/{}/images", spot_id),
            Some(&owner),
            json!({ "url": "front.jpg", "preview": true }),
        )
        .await;
    let spot_image = format!("/api/spot-images/{}", res.body["id"]);

    let res = app.delete(&spot_image, Some(&guest)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&spot_image, Some(&owner)).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.delete(&spot_image, Some(&owner)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Spot Image couldn't be found");

    let res = app
        .post(
            &format!("/api/spots/{}/reviews", spot_id),
            Some(&guest),
            json!({ "review": "Great stay", "stars": 5 }),
        )
        .await;
    let res = app
        .post(
            &format!("/api/reviews/{}/images", res.body["id"]),
            Some(&guest),
            json!({ "url": "pic.jpg" }),
        )
        .await;
    let review_image = format!("/api/review-images/{}", res.body["id"]);

    let res = app.delete(&review_image, Some(&owner)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&review_image, Some(&guest)).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.delete(&review_image, Some(&guest)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Review Image couldn't be found");
}

#[tokio::test]
async fn test_unique_index_rejects_second_review() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (guest_id, _) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await as i32;

    let row = || review::ActiveModel {
        user_id: Set(guest_id),
        spot_id: Set(spot_id),
        review: Set("Great stay".to_string()),
        stars: Set(5),
        ..Default::default()
    };
    row().insert(&app.db).await.unwrap();

    // a second row that skipped the handler's lookup still hits the index
    let err = row().insert(&app.db).await.unwrap_err();
    let err = review_insert_error(err);
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(err.to_string(), "User already has a review for this spot");
}

#[tokio::test]
async fn test_stars_must_be_a_whole_number() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("owner").await;
    let (_, guest) = app.user("guest").await;
    let spot_id = app.spot(&owner, "App Academy").await;
    let uri = format!("/api/spots/{}/reviews", spot_id);

    for stars in [json!(4.5), json!("five"), json!(null)] {
        let res = app
            .post(&uri, Some(&guest), json!({ "review": "ok", "stars": stars }))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["errors"]["stars"], "Stars must be an integer from 1 to 5.");
    }

    let res = app
        .post(&uri, Some(&guest), json!({ "review": "ok", "stars": 3 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["stars"], 3);
}

#[tokio::test]
async fn test_malformed_review_ids_are_not_found() {
    let app = TestApp::new().await;
    let (_, guest) = app.user("guest").await;

    let res = app
        .put(
            "/api/reviews/abc",
            Some(&guest),
            json!({ "review": "ok", "stars": 3 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Review couldn't be found");

    let res = app.delete("/api/review-images/1.5", Some(&guest)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Review Image couldn't be found");
}
