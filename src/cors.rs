use http::Method;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost,https://localhost,http://127.0.0.1,https://127.0.0.1";

/// Build a CORS layer for the JSON API with the given allowed origins.
///
/// Pass "*" in the origins list to allow all origins (not recommended for
/// production).
#[must_use]
pub fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let allow_all_origins = cors_origins.iter().any(|o| o == "*");

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            if allow_all_origins {
                return true;
            }

            origin.to_str().is_ok_and(|origin_str| {
                cors_origins
                    .iter()
                    .any(|allowed| origin_str.starts_with(allowed))
            })
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origins_include_localhost() {
        assert!(DEFAULT_CORS_ORIGINS.contains("http://localhost"));
        assert!(DEFAULT_CORS_ORIGINS.contains("https://127.0.0.1"));
    }

    #[test]
    fn test_build_cors_layer_accepts_origin_list() {
        let _unused = build_cors_layer(vec!["https://admin.example.com".to_string()]);
        let _unused = build_cors_layer(vec!["*".to_string()]);
    }
}
