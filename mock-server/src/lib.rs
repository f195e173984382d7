//! In-process stand-in for the content API.
//!
//! Serves JSON:API envelopes under `/v1`, reports failures as `errors`
//! bodies, embeds redirects in the body, paginates posts through
//! `links.next`, and optionally checks a static public key.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const KEY_HEADER: &str = "x-public-key";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const POST_COUNT: usize = 5;

#[derive(Clone, Debug, Default)]
pub struct AppState {
    public_key: Option<Arc<str>>,
}

/// Router without key checking.
pub fn app() -> Router {
    app_with_key(None)
}

/// Router that rejects requests lacking `key` in `x-public-key`.
pub fn app_with_key(key: Option<&str>) -> Router {
    let state = AppState {
        public_key: key.map(Arc::from),
    };
    Router::new()
        .route("/v1/posts", get(list_posts))
        .route("/v1/posts/{id}", get(get_post))
        .route("/v1/categories", get(list_categories))
        .route("/v1/media/{id}", get(get_media))
        .route("/v1/slow", get(slow))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), check_key))
        .layer(middleware::from_fn(stamp_request_id))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, key: Option<&str>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(key)).await
}

/// Body of a failed request in the API's `errors` format.
pub fn error_body(status: u16, title: &str, detail: &str) -> Value {
    json!({"errors": [{"status": status, "title": title, "detail": detail}]})
}

fn error_response(status: StatusCode, title: &str, detail: &str) -> Response {
    (status, Json(error_body(status.as_u16(), title, detail))).into_response()
}

async fn stamp_request_id(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn check_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.public_key {
        let given = headers.get(KEY_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(expected.as_ref()) {
            tracing::debug!("rejecting request without a valid public key");
            return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", "missing or invalid public key");
        }
    }
    next.run(request).await
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found", "no such route")
}

fn post(id: usize) -> Value {
    json!({
        "id": id.to_string(),
        "type": "post",
        "attributes": {"title": format!("Post {id}"), "slug": format!("post-{id}")},
        "relationships": {
            "author": {"data": {"id": "1", "type": "author"}},
            "thumbnail": {"data": {"id": "123", "type": "image"}}
        }
    })
}

fn author() -> Value {
    json!({"id": "1", "type": "author", "attributes": {"name": "Ada"}})
}

fn image() -> Value {
    json!({
        "id": "123",
        "type": "image",
        "attributes": {
            "mimetype": "image/jpeg",
            "width": 1920,
            "height": 1080,
            "fingerprints": {
                "cover": "abc-cover",
                "default": "abc-default",
                "thumb": "abc-thumb",
                "source": "abc-source"
            }
        }
    })
}

fn video() -> Value {
    json!({
        "id": "456",
        "type": "video",
        "attributes": {
            "mimetype": "video/mp4",
            "width": 1280,
            "height": 720,
            "duration": 31.5,
            "fingerprints": {"default": "vid-default", "source": "vid-source", "cover": "vid-cover"}
        }
    })
}

fn category(id: u32, parent: Option<u32>) -> Value {
    let parent = parent.map(|p| json!({"id": p.to_string(), "type": "category"}));
    json!({
        "id": id.to_string(),
        "type": "category",
        "attributes": {"name": format!("Category {id}"), "path": format!("/c/{id}"), "slug": format!("c-{id}")},
        "relationships": {
            "parentCategory": {"data": parent},
            "thumbnail": {"data": null}
        }
    })
}

/// `page[size]` / `page[number]`; zero or unparsable values fall back.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(rename = "page[size]")]
    size: Option<String>,
    #[serde(rename = "page[number]")]
    number: Option<String>,
}

impl PageParams {
    fn size(&self) -> usize {
        positive(self.size.as_deref()).unwrap_or(POST_COUNT)
    }

    fn number(&self) -> usize {
        positive(self.number.as_deref()).unwrap_or(1)
    }
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|v| v.parse().ok()).filter(|n| *n > 0)
}

async fn list_posts(Query(params): Query<PageParams>) -> Json<Value> {
    let size = params.size();
    let number = params.number();
    let start = (number - 1).saturating_mul(size).saturating_add(1);
    let end = start.saturating_add(size - 1).min(POST_COUNT);
    let data: Vec<Value> = (start..=end).map(post).collect();
    let next = (end < POST_COUNT)
        .then(|| format!("/v1/posts?page[size]={size}&page[number]={}", number + 1));
    Json(json!({
        "meta": {"total": POST_COUNT},
        "data": data,
        "included": [author(), image()],
        "links": {"self": format!("/v1/posts?page[size]={size}&page[number]={number}"), "next": next}
    }))
}

async fn get_post(Path(id): Path<String>) -> Response {
    if let Some(target) = id.strip_prefix("moved-") {
        // Redirects travel in the body of a 200.
        return Json(error_body(301, "Moved Permanently", &format!("/v1/posts/{target}")))
            .into_response();
    }
    match id.parse::<usize>() {
        Ok(n) if (1..=POST_COUNT).contains(&n) => Json(json!({
            "data": post(n),
            "included": [author(), image()],
            "links": {"self": format!("/v1/posts/{n}")}
        }))
        .into_response(),
        _ => error_response(StatusCode::NOT_FOUND, "Not Found", &format!("post {id} does not exist")),
    }
}

// 1 <- 2 <- 3, 4;  1 <- 5;  6 <- 7
async fn list_categories() -> Json<Value> {
    Json(json!({
        "data": [
            category(1, None),
            category(2, Some(1)),
            category(3, Some(2)),
            category(4, Some(2)),
            category(5, Some(1)),
            category(6, None),
            category(7, Some(6)),
        ],
        "included": [],
        "links": {"self": "/v1/categories"}
    }))
}

async fn get_media(Path(id): Path<String>) -> Response {
    let data = match id.as_str() {
        "123" => image(),
        "456" => video(),
        _ => return error_response(StatusCode::NOT_FOUND, "Not Found", &format!("media {id} does not exist")),
    };
    Json(json!({"data": data, "included": [], "links": {}})).into_response()
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Json(json!({"data": null}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_shape() {
        let body = error_body(404, "Not Found", "missing");
        assert_eq!(body["errors"][0]["status"], 404);
        assert_eq!(body["errors"][0]["title"], "Not Found");
        assert_eq!(body["errors"][0]["detail"], "missing");
    }

    #[test]
    fn category_root_has_null_parent() {
        let root = category(1, None);
        assert!(root["relationships"]["parentCategory"]["data"].is_null());
        let child = category(2, Some(1));
        assert_eq!(child["relationships"]["parentCategory"]["data"]["id"], "1");
    }

    #[test]
    fn page_params_fall_back_on_garbage() {
        let params = PageParams {
            size: Some("0".to_string()),
            number: Some("abc".to_string()),
        };
        assert_eq!(params.size(), POST_COUNT);
        assert_eq!(params.number(), 1);
        assert_eq!(PageParams::default().size(), POST_COUNT);
    }
}
