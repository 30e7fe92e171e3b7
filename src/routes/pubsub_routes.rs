use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use crate::errors::RelayError;
use crate::services::formatter::PUBLISH_ACK;
use crate::services::pubsub_service::{publish, subscribe};
use crate::state::AppState;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET,POST";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/sub", any(handle_subscribe))
        .route("/pub", any(handle_publish))
        .with_state(state)
}

/// Raw query pairs, kept in request order so repeated keys do not reject
/// the whole query.
type QueryPairs = Query<Vec<(String, String)>>;

/// First value of `name`. A query string that does not parse has none.
fn first_param(params: Option<QueryPairs>, name: &str) -> Option<String> {
    let Query(pairs) = params?;
    pairs
        .into_iter()
        .find_map(|(key, value)| (key == name).then_some(value))
}

//
// ─────────────────────────────────────────────────────────────
// GET /sub[?callback=NAME]
// Hold the response open until the next publish
// ─────────────────────────────────────────────────────────────
//
async fn handle_subscribe(
    method: Method,
    State(state): State<AppState>,
    params: Option<QueryPairs>,
) -> Result<Response, RelayError> {
    if method != Method::GET {
        return Err(RelayError::InvalidMethod);
    }

    // `callback=` with no name still wraps, as `({content: ...})`.
    let callback = first_param(params, "callback");

    let stream = subscribe(&state.registry, callback, state.max_hold);

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    insert_cors(headers);

    Ok(response)
}

//
// ─────────────────────────────────────────────────────────────
// GET /pub[?content=TEXT]
// Notify and close every held subscriber, then acknowledge
// ─────────────────────────────────────────────────────────────
//
async fn handle_publish(
    method: Method,
    State(state): State<AppState>,
    params: Option<QueryPairs>,
) -> Result<Response, RelayError> {
    if method != Method::GET {
        return Err(RelayError::InvalidMethod);
    }

    let content = first_param(params, "content").unwrap_or_else(|| state.payload.to_string());

    publish(&state.registry, &content).await;

    let mut response = (StatusCode::OK, PUBLISH_ACK).into_response();
    insert_cors(response.headers_mut());
    Ok(response)
}

/// Any route other than /sub and /pub.
pub async fn bad_request() -> RelayError {
    RelayError::BadRequest
}

fn insert_cors(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Option<QueryPairs> {
        Some(Query(
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn repeated_key_takes_the_first_value() {
        let params = pairs(&[("callback", "first"), ("callback", "second")]);
        assert_eq!(first_param(params, "callback").as_deref(), Some("first"));
    }

    #[test]
    fn empty_value_is_kept() {
        let params = pairs(&[("callback", "")]);
        assert_eq!(first_param(params, "callback").as_deref(), Some(""));
    }

    #[test]
    fn missing_or_unparsed_query_has_no_value() {
        assert_eq!(first_param(pairs(&[("other", "x")]), "callback"), None);
        assert_eq!(first_param(None, "callback"), None);
    }
}
