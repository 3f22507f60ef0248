#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{json, Value};
use tower::ServiceExt;

use spots_backend::{
    config::Config, db, entities::user, middleware::rate_limit::create_global_governor, routes,
    utils::jwt::create_token, AppState,
};

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        // One pooled connection keeps the in-memory database alive
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(options).await.unwrap();
        db::migrate(&db).await.unwrap();

        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: SECRET.to_string(),
            jwt_expiration_hours: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            secure_cookies: false,
            seed_demo_user: false,
        };

        let router = routes::create_router(AppState {
            db: db.clone(),
            config,
        });

        Self { router, db }
    }

    /// Serve through the production middleware with a tight per-IP limit.
    pub fn with_rate_limit(mut self, per_millisecond: u64, burst: u32) -> Self {
        let governor = create_global_governor(per_millisecond, burst).unwrap();
        self.router = routes::with_middleware(self.router, governor)
            .layer(Extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)))));
        self
    }

    /// Insert a user directly and return a session token for them.
    pub async fn user(&self, username: &str) -> (i32, String) {
        let user = user::ActiveModel {
            first_name: Set(username.to_string()),
            last_name: Set("Tester".to_string()),
            email: Set(format!("{}@example.com", username)),
            username: Set(username.to_string()),
            password_hash: Set("unused".to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();

        let token = create_token(user.id, &user.email, &user.username, SECRET, 1).unwrap();
        (user.id, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("token={}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Create a spot as the given user and return its id.
    pub async fn spot(&self, token: &str, name: &str) -> i64 {
        let res = self.post("/api/spots", Some(token), spot_body(name)).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }
}

pub fn spot_body(name: &str) -> Value {
    json!({
        "address": "123 Disney Lane",
        "city": "San Francisco",
        "state": "California",
        "country": "United States of America",
        "lat": 37.7645358,
        "lng": -122.4730327,
        "name": name,
        "description": "Place where web developers are created",
        "price": 123
    })
}
