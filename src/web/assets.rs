//! Bundled static assets served under `/static/`

use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Content type for the asset kinds we ship; anything else goes out untyped.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let (_, ext) = path.rsplit_once('.')?;
    match ext {
        "html" => Some("text/html"),
        "png" => Some("image/png"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        _ => None,
    }
}

pub async fn serve_static(Path(path): Path<String>) -> Response {
    let Some(file) = StaticAssets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Body (unlike Vec<u8>) carries no implicit octet-stream content type.
    let mut response = Response::new(Body::from(file.data.into_owned()));
    if let Some(content_type) = content_type_for(&path) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}
