//! Rejects query parameters no route understands.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request};
use axum::middleware::Next;
use axum::response::Response;

use gateway_common::error::AppError;

/// Query parameters accepted anywhere in the API.
const ALLOWED_QUERY_PARAMS: &[&str] = &[];

pub async fn reject_unknown_query_params(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Query(params) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    let unknown = unknown_params(&params);
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Unsupported query parameters: {}",
            unknown.join(", ")
        )));
    }

    Ok(next.run(request).await)
}

/// Decoded names not in the allow list, first occurrence only.
fn unknown_params(params: &[(String, String)]) -> Vec<&str> {
    let mut unknown: Vec<&str> = Vec::new();
    for (name, _) in params {
        if !ALLOWED_QUERY_PARAMS.contains(&name.as_str()) && !unknown.contains(&name.as_str()) {
            unknown.push(name);
        }
    }
    unknown
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequestParts;
    use axum::http::Request as HttpRequest;

    use super::*;

    async fn decoded(uri: &str) -> Vec<(String, String)> {
        let (mut parts, _) = HttpRequest::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        let Query(params) = Query::<Vec<(String, String)>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        params
    }

    #[tokio::test]
    async fn test_names_are_percent_decoded() {
        let params = decoded("/status?%66oo=1&a+b=2&foo=3&flag").await;
        assert_eq!(unknown_params(&params), vec!["foo", "a b", "flag"]);
    }

    #[test]
    fn test_no_params_is_accepted() {
        assert!(unknown_params(&[]).is_empty());
    }
}
