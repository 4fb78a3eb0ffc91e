//! Identity middleware.
//!
//! Tokens have the form `v1.<id>.<role>.<tag>` where the tag is an
//! HMAC-SHA256 over the preceding payload, hex-encoded. Verification is
//! constant time. The gateway attaches the resulting [`Principal`] to the
//! request; the core trusts it completely.

use crate::domain::error::ApiError;
use crate::router::AppState;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clinic_core::{EntityId, Principal, Role};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v1";

fn mac(secret: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(secret).expect("hmac key of any length")
}

/// Mint a token for a principal. Used by the identity collaborator and by
/// tests.
pub fn mint_token(secret: &[u8], principal: &Principal) -> String {
    let payload = format!("{VERSION}.{}.{}", principal.id, principal.role);
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    let tag = hex::encode(mac.finalize().into_bytes());
    format!("{payload}.{tag}")
}

/// Verify a token and recover its principal. Any malformed, tampered or
/// foreign-secret token yields `None`; callers never learn which.
pub fn verify_token(secret: &[u8], token: &str) -> Option<Principal> {
    let (payload, tag) = token.rsplit_once('.')?;
    let mut parts = payload.split('.');
    if parts.next()? != VERSION {
        return None;
    }
    let id = EntityId::parse(parts.next()?).ok()?;
    let role = Role::parse(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    let expected = mac.finalize().into_bytes();
    let provided = hex::decode(tag).ok()?;
    // ct_eq rejects length mismatches without a timing side channel.
    if expected.ct_eq(provided.as_slice()).into() {
        Some(Principal { id, role })
    } else {
        None
    }
}

/// Reject the request unless it carries a valid bearer token; otherwise
/// attach the verified [`Principal`] as a request extension.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_token(&request)
        .and_then(|token| verify_token(state.auth_secret.as_bytes(), &token))
    {
        Some(principal) => {
            debug!(principal = %principal.id, role = %principal.role, "request authenticated");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        None => ApiError::unauthorized("missing or invalid bearer token").into_response(),
    }
}

fn extract_token(request: &Request) -> Option<String> {
    if let Some(header) = request.headers().get(header::AUTHORIZATION) {
        if let Some(token) = header.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            return Some(token.to_string());
        }
    }
    // Browsers cannot set headers on a WebSocket upgrade; accept a query
    // parameter there.
    request.uri().query().and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .map(str::to_string)
    })
}
