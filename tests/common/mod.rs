#![allow(dead_code)]
//! Test harness driving the real router in-process.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use estate_gateway::notify::{EmailMessage, Templates};
use estate_gateway::rate_limit::RateLimitProfiles;
use estate_gateway::worker::notification_channel;
use estate_gateway::{AppState, SharedState, bootstrap_admin, build_router};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "AdminPass1";
pub const PASSWORD: &str = "Password1";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    mail_rx: Mutex<mpsc::Receiver<EmailMessage>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_profiles(RateLimitProfiles::default())
    }

    pub fn with_profiles(profiles: RateLimitProfiles) -> Self {
        let (notifier, mail_rx) = notification_channel(64);
        let state = Arc::new(AppState::new(
            profiles,
            Duration::from_secs(30),
            chrono::Duration::hours(1),
            Templates::new("Estate Test", "https://estate.test"),
            notifier,
        ));
        bootstrap_admin(&state, ADMIN_EMAIL, ADMIN_PASSWORD).expect("bootstrap admin");

        Self {
            router: build_router(state.clone()),
            state,
            mail_rx: Mutex::new(mail_rx),
        }
    }

    /// Send a request from client address `ip`, optionally authenticated.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        ip: &str,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, None, token, "10.0.0.1").await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.call(Method::POST, uri, Some(body), token, "10.0.0.1").await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.call(Method::PUT, uri, Some(body), token, "10.0.0.1").await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::DELETE, uri, None, token, "10.0.0.1").await
    }

    /// Register an account from its own client address and return its token.
    pub async fn register(&self, email: &str, role: &str) -> String {
        let response = self
            .call(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "name": "Test Person",
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                })),
                None,
                &format!("register-{email}"),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": email, "password": password })),
            None,
            &format!("login-{email}"),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    /// Create a listing as `token` and return its id.
    pub async fn create_listing(&self, token: &str, title: &str, city: &str, price: u64) -> String {
        let response = self
            .post("/api/properties", listing_body(title, city, price), Some(token))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().expect("id").to_string()
    }

    pub async fn approve(&self, admin: &str, id: &str) {
        let response = self
            .put(
                &format!("/api/admin/properties/{id}/status"),
                json!({ "status": "approved" }),
                Some(admin),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    /// Drain every e-mail queued so far.
    pub fn outbox(&self) -> Vec<EmailMessage> {
        let mut rx = self.mail_rx.lock().expect("mail receiver lock");
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

pub fn listing_body(title: &str, city: &str, price: u64) -> Value {
    json!({
        "title": title,
        "description": "Spacious home with plenty of natural light.",
        "price": price,
        "property_type": "apartment",
        "listing_type": "sale",
        "address": "42 Residency Road",
        "city": city,
        "state": "Karnataka",
        "bedrooms": 3,
        "bathrooms": 2,
        "area_sqft": 1450,
        "amenities": ["Lift", "Parking"],
        "images": ["https://img.example.com/a.jpg"],
    })
}
