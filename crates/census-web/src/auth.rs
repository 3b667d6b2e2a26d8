//! HTTP basic auth gate.
//!
//! When `appconfig.auth_on` is set the whole application sits behind basic
//! auth. The configured password hash has the form
//! `sha256$<salt>$<hex digest of salt + password>`; verification compares
//! digests in constant time.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use sha2::{Digest, Sha256};

use crate::state::AppState;

const SCHEME: &str = "sha256";

/// Hash a password with a salt in the `sha256$<salt>$<hex>` format.
pub fn hash_password(salt: &str, password: &str) -> String {
    format!("{SCHEME}${salt}${}", digest_hex(salt, password))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(SCHEME), Some(salt), Some(_)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    constant_time_eq(hash_password(salt, password).as_bytes(), stored.as_bytes())
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode `Authorization: Basic ...` into `(user, password)`.
pub fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = B64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_owned(), password.to_owned()))
}

fn challenge() -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Authorization Required\""),
    );
    response
}

/// Reject requests without valid basic-auth credentials.
pub async fn basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let app = &state.settings.appconfig;
    let authorized = credentials(request.headers()).is_some_and(|(user, password)| {
        let valid_user = constant_time_eq(user.as_bytes(), app.auth_user.as_bytes());
        let valid_pass = verify_password(&app.auth_passhash, &password);
        valid_user && valid_pass
    });

    if authorized {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "basic auth rejected");
        challenge()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("pepper", "s3cret");
        assert!(stored.starts_with("sha256$pepper$"));
        assert!(verify_password(&stored, "s3cret"));
        assert!(!verify_password(&stored, "wrong"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("md5$salt$abc", "abc"));
        assert!(!verify_password("sha256$salt", "abc"));
    }

    #[test]
    fn decodes_basic_credentials() {
        let mut headers = HeaderMap::new();
        let encoded = B64.encode("admin:pa:ss");
        let value = HeaderValue::from_str(&format!("Basic {encoded}")).unwrap();
        headers.insert(header::AUTHORIZATION, value);
        assert_eq!(
            credentials(&headers),
            Some((String::from("admin"), String::from("pa:ss")))
        );
    }

    #[test]
    fn rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(credentials(&headers), None);
    }
}
