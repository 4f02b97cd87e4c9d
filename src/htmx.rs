/// HTMX utils
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// `Location` for plain browser requests (paired with a 3xx status by the
/// caller) and `Hx-Redirect` for htmx requests.
pub fn redirect(to: &str) -> HeaderMap {
    let value = HeaderValue::from_str(to)
        .unwrap_or(HeaderValue::from_static("/"));
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, value.clone());
    headers.insert("Hx-Redirect", value);
    headers
}

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("Hx-Request")
}

/// Send the browser to `to`. htmx requests get a 200 carrying
/// `Hx-Redirect`, since the XHR would otherwise follow a 303 by itself and
/// swap the next page into the target.
pub fn navigate(to: &str, request_headers: &HeaderMap) -> Response {
    let status = if is_htmx(request_headers) {
        StatusCode::OK
    } else {
        StatusCode::SEE_OTHER
    };
    (status, redirect(to)).into_response()
}

/// Error fragments go into the flash region instead of the element that
/// issued the request.
pub fn retarget_flash() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Hx-Retarget", HeaderValue::from_static("#flash"));
    headers.insert("Hx-Reswap", HeaderValue::from_static("innerHTML"));
    headers
}
