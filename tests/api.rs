mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use threadline::api::create_router;

use common::{test_app, TestApp};

const BOUNDARY: &str = "threadline-test-boundary";

fn multipart(fields: &[(&str, &str)], files: &[(&str, &str)]) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for (name, file_name) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"\x89PNG fake image bytes");
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn multipart_request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<String>, Value) {
    let response = create_router(app.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookies, body)
}

fn cookie_value(cookies: &[String], name: &str) -> String {
    cookies
        .iter()
        .find_map(|cookie| cookie.strip_prefix(&format!("{}=", name)))
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string()
}

async fn register(app: &TestApp, username: &str) -> (Value, Vec<String>) {
    let email = format!("{}@example.com", username);
    let body = multipart(
        &[
            ("username", username),
            ("email", email.as_str()),
            ("password", "s3cret-pass"),
            ("fullName", "Test User"),
        ],
        &[("avatar", "me.png")],
    );
    let (status, cookies, body) = send(
        app,
        multipart_request(Method::POST, "/api/v1/users/register", None, body),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    (body, cookies)
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, _, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_register_sets_session_cookies() {
    let app = test_app().await;
    let (body, cookies) = register(&app, "alice").await;

    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("password").is_none());
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    assert_eq!(
        cookie_value(&cookies, "accessToken"),
        body["data"]["accessToken"].as_str().unwrap()
    );

    // The cookie alone authenticates
    let access = cookie_value(&cookies, "accessToken");
    let request = Request::builder()
        .uri("/api/v1/users/alice")
        .header(header::COOKIE, format!("accessToken={}", access))
        .body(Body::empty())
        .unwrap();
    let (status, _, profile) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["data"]["username"], "alice");
    assert_eq!(profile["data"]["isFollowing"], false);
}

#[tokio::test]
async fn test_protected_routes_need_a_viewer() {
    let app = test_app().await;
    let (status, _, body) = send(
        &app,
        json_request(Method::POST, "/api/v1/followers/toggle-follow", None, json!({"userId": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["message"], "Unauthorized request");
    assert_eq!(body["errors"], json!([]));

    let (status, _, _) = send(
        &app,
        json_request(Method::POST, "/api/v1/users/logout", Some("not-a-token"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_then_follow_and_list() {
    let app = test_app().await;
    let (target, _) = register(&app, "star").await;
    register(&app, "fan").await;
    let star_id = target["data"]["user"]["_id"].as_str().unwrap().to_string();

    let (status, cookies, login) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({"email": "FAN@example.com", "password": "s3cret-pass"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookies.len(), 2);
    let token = login["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, _, follow) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/followers/toggle-follow",
            Some(&token),
            json!({"userId": star_id, "isFollowing": false}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(follow["data"]["isFollowing"], true);

    let (status, _, followers) = send(
        &app,
        get(
            &format!("/api/v1/followers/get-followers?userId={}&page=1&limit=10", star_id),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(followers["data"]["totalDocs"], 1);
    assert_eq!(followers["data"]["docs"][0]["username"], "fan");
    assert_eq!(followers["data"]["limit"], 10);
}

#[tokio::test]
async fn test_post_like_and_list_over_http() {
    let app = test_app().await;
    let (session, _) = register(&app, "writer").await;
    let token = session["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, _, created) = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/v1/posts/add",
            Some(&token),
            multipart(&[("content", "hello world")], &[("media", "one.png"), ("media", "two.png")]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["media"].as_array().unwrap().len(), 2);
    let post_id = created["data"]["_id"].as_str().unwrap().to_string();

    let (status, _, like) = send(
        &app,
        json_request(Method::POST, "/api/v1/likes/toggle-like", Some(&token), json!({"postId": post_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(like["data"]["liked"], true);

    let (status, _, invalid) = send(
        &app,
        json_request(Method::POST, "/api/v1/likes/toggle-like", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid["success"], false);

    // Listing works anonymously; isLiked is then false
    let (status, _, anonymous) = send(&app, get("/api/v1/posts/WRITER?page=1&limit=5", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anonymous["data"]["docs"][0]["likes"], 1);
    assert_eq!(anonymous["data"]["docs"][0]["isLiked"], false);

    let (_, _, mine) = send(&app, get("/api/v1/posts/writer", Some(&token))).await;
    assert_eq!(mine["data"]["docs"][0]["isLiked"], true);
    assert_eq!(mine["data"]["docs"][0]["owner"]["username"], "writer");
}

#[tokio::test]
async fn test_refresh_and_logout_cookies() {
    let app = test_app().await;
    let (_, cookies) = register(&app, "sam").await;
    let refresh = cookie_value(&cookies, "refreshToken");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/refreshtokens")
        .header(header::COOKIE, format!("refreshToken={}", refresh))
        .body(Body::empty())
        .unwrap();
    let (status, rotated, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(cookie_value(&rotated, "refreshToken"), refresh);
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, cleared, _) = send(
        &app,
        json_request(Method::POST, "/api/v1/users/logout", Some(&access), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));

    let reuse = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/refreshtokens")
        .header(header::COOKIE, format!("refreshToken={}", cookie_value(&rotated, "refreshToken")))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, reuse).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let app = test_app().await;
    register(&app, "alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], json!([]));
    assert!(body["message"].as_str().unwrap().contains("JSON"));

    let (status, _, body) = send(&app, get("/api/v1/posts/alice?page=abc", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);

    // Not multipart at all
    let (_, cookies) = register(&app, "bob").await;
    let token = cookie_value(&cookies, "accessToken");
    let (status, _, body) = send(
        &app,
        json_request(Method::POST, "/api/v1/posts/add", Some(&token), json!({"content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
