use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{ Hmac, Mac };
use serde::Deserialize;
use serde_json::{ Map, Value as JsonValue };
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("JWT_SECRET not configured")]
    NotConfigured,
    #[error("Invalid token")]
    Malformed,
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Invalid token")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    NotYetValid,
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Verified token payload.
#[derive(Debug, Clone)]
pub struct Claims {
    pub claims: Map<String, JsonValue>,
}

impl Claims {
    /// The `id` claim, accepted as a string or a number.
    pub fn user_id(&self) -> Option<String> {
        match self.claims.get("id")? {
            JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Checks HS256-signed bearer tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Option<String>,
}

impl TokenVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret: secret.filter(|s| !s.is_empty()) }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let secret = self.secret.as_ref().ok_or(VerificationError::NotConfigured)?;

        let mut parts = token.trim().split('.');
        let (header_b64, payload_b64, signature_b64) = match
            (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(VerificationError::Malformed);
            }
        };

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != "HS256" {
            return Err(VerificationError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| VerificationError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(
            |_| VerificationError::NotConfigured
        )?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature).map_err(|_| VerificationError::BadSignature)?;

        let claims: Map<String, JsonValue> = decode_segment(payload_b64)?;
        let now = Utc::now().timestamp() as f64;
        if let Some(exp) = claims.get("exp") {
            let exp = exp.as_f64().ok_or(VerificationError::Malformed)?;
            if now >= exp {
                return Err(VerificationError::Expired);
            }
        }
        if let Some(nbf) = claims.get("nbf") {
            let nbf = nbf.as_f64().ok_or(VerificationError::Malformed)?;
            if nbf > now {
                return Err(VerificationError::NotYetValid);
            }
        }

        Ok(Claims { claims })
    }
}

/// Strips the `Bearer ` scheme from an Authorization header value.
pub fn bearer_token(header_value: &str) -> &str {
    header_value.strip_prefix("Bearer ").unwrap_or(header_value).trim()
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, VerificationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| VerificationError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerificationError::Malformed)
}
