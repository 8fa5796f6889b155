//! Auth interceptor (spec.md §4.A): reads the `cactus-token` metadata entry
//! (not an `Authorization: Bearer` header — this wire carries the raw
//! three-segment JWT directly), validates it, and lifts the token's
//! `consumerId` claim (if present) into the call's request extensions as a
//! `ConsumerId`, so downstream RPC handlers can read it without re-parsing
//! the token.
//!
//! Deliberately hand-rolled instead of routed through the `jsonwebtoken`
//! crate the teacher's `sem_os_server::middleware::jwt` uses: the spec calls
//! out the verification steps individually (split, base64url-decode,
//! recompute the HMAC, compare in constant time, then check `exp`), and
//! `jsonwebtoken::decode` collapses all of that behind one call that doesn't
//! expose a constant-time-only comparison path. See SPEC_FULL.md "Auth
//! filter" for the full rationale.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tonic::{Request, Status};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
    #[serde(rename = "consumerId")]
    consumer_id: Option<String>,
}

/// Lifted from a validated token's claims and injected into the call's
/// request extensions under this type (spec.md §4.A step 7), the same way
/// `sem_os_server::middleware::jwt::jwt_auth` inserts its `Principal`.
#[derive(Debug, Clone)]
pub struct ConsumerId(pub String);

fn b64url_decode(segment: &str) -> Result<Vec<u8>, Status> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| Status::unauthenticated("invalid token encoding"))
}

/// Verify a compact `header.payload.signature` JWT against `secret`.
/// Returns the claimed `consumerId` (if the token carries one) when the
/// signature is valid, the algorithm is HS256, and `exp` (when present) has
/// not passed.
fn verify_token(token: &str, secret: &[u8]) -> Result<Option<String>, Status> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Status::unauthenticated("malformed token"));
    };

    let header_bytes = b64url_decode(header_b64)?;
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|_| Status::unauthenticated("malformed token header"))?;
    if header.alg != "HS256" {
        return Err(Status::unauthenticated("unsupported token algorithm"));
    }

    let payload_bytes = b64url_decode(payload_b64)?;
    let claims: Claims = serde_json::from_slice(&payload_bytes)
        .map_err(|_| Status::unauthenticated("malformed token payload"))?;

    let signature = b64url_decode(sig_b64)?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| Status::internal("invalid signing key"))?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    let expected = mac.finalize().into_bytes();

    if expected.len() != signature.len() || expected.ct_eq(&signature).unwrap_u8() != 1 {
        return Err(Status::unauthenticated("invalid token signature"));
    }

    if let Some(exp) = claims.exp {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Status::internal("system clock error"))?
            .as_secs() as i64;
        if now >= exp {
            return Err(Status::unauthenticated("token expired"));
        }
    }

    Ok(claims.consumer_id)
}

/// Caches the JWT signing secret fetched once at start-up from the secret
/// store, mirroring the `sync.Once`-guarded cache in
/// `examples/original_source/src/gcp.go`'s `getTangoJWTSecret`.
pub struct AuthInterceptor {
    secret: &'static [u8],
}

static SECRET_CELL: OnceLock<Vec<u8>> = OnceLock::new();

impl AuthInterceptor {
    /// Install the process-wide secret. Must be called once before any
    /// interceptor runs; subsequent calls are no-ops.
    pub fn init_secret(secret: Vec<u8>) {
        let _ = SECRET_CELL.set(secret);
    }

    pub fn new() -> Self {
        let secret = SECRET_CELL.get().expect("AuthInterceptor::init_secret was not called");
        Self { secret }
    }

    #[cfg(test)]
    fn with_secret_for_test(secret: &'static [u8]) -> Self {
        Self { secret }
    }
}

impl tonic::service::Interceptor for AuthInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let token = req
            .metadata()
            .get("cactus-token")
            .ok_or_else(|| Status::unauthenticated("missing cactus-token metadata"))?
            .to_str()
            .map_err(|_| Status::unauthenticated("invalid cactus-token metadata"))?
            .to_string();

        let result = verify_token(&token, self.secret);
        let consumer_id = match result {
            Ok(consumer_id) => consumer_id,
            Err(e) => {
                tracing::warn!(error = %e, "token validation failed");
                return Err(e);
            }
        };

        if let Some(consumer_id) = consumer_id {
            req.extensions_mut().insert(ConsumerId(consumer_id));
        }
        Ok(req)
    }
}
