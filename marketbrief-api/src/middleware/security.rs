/// Security headers middleware
///
/// Adds security-related HTTP headers to every response, following
/// OWASP recommendations.
///
/// # Headers Applied
///
/// - `X-Content-Type-Options: nosniff` - Prevents MIME type sniffing
/// - `X-Frame-Options: DENY` - Prevents clickjacking
/// - `X-XSS-Protection: 1; mode=block` - Enables XSS protection in older browsers
/// - `Strict-Transport-Security` - Forces HTTPS (production only)
/// - `Content-Security-Policy` - Restricts resource loading
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Controls referrer information
/// - `Permissions-Policy` - Controls browser features
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, Router};
/// use marketbrief_api::middleware::security::create_security_headers_middleware;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(create_security_headers_middleware(true)));
/// ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Headers applied to every response, production or not
const BASE_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "geolocation=(), microphone=(), camera=(), payment=(), usb=()",
    ),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; \
         img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'",
    ),
];

/// HSTS header, only meaningful behind HTTPS
const HSTS_HEADER: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains; preload",
);

/// Stamps the security header set onto a response header map
pub fn apply_security_headers(headers: &mut HeaderMap, enable_hsts: bool) {
    for (name, value) in BASE_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    if enable_hsts {
        headers.insert(
            HeaderName::from_static(HSTS_HEADER.0),
            HeaderValue::from_static(HSTS_HEADER.1),
        );
    }
}

/// Creates a security-headers middleware closure
///
/// Captures the HSTS flag so the middleware can be installed with
/// `middleware::from_fn`. HSTS should only be enabled in production
/// where the server sits behind HTTPS.
pub fn create_security_headers_middleware(
    enable_hsts: bool,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone {
    move |req, next| {
        Box::pin(async move {
            let mut response = next.run(req).await;
            apply_security_headers(response.headers_mut(), enable_hsts);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_headers_applied() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, false);

        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(headers.get("X-XSS-Protection").unwrap(), "1; mode=block");
        assert_eq!(
            headers.get("Referrer-Policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert!(headers.get("Content-Security-Policy").is_some());
        assert!(headers.get("Permissions-Policy").is_some());
    }

    #[test]
    fn test_hsts_enabled_in_production() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, true);

        assert!(headers.get("Strict-Transport-Security").is_some());
    }

    #[test]
    fn test_hsts_disabled_in_dev() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, false);

        assert!(headers.get("Strict-Transport-Security").is_none());
    }

    #[tokio::test]
    async fn test_middleware_stamps_responses() {
        use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
        use tower::Service as _;

        let mut app: Router = Router::new()
            .route("/test", get(|| async { (StatusCode::OK, "test") }))
            .layer(middleware::from_fn(create_security_headers_middleware(
                false,
            )));

        let response = app
            .call(
                axum::http::Request::builder()
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );
        assert!(response
            .headers()
            .get("Strict-Transport-Security")
            .is_none());
    }
}
