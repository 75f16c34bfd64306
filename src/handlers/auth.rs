//! Bearer-token authentication for administrator routes.
//!
//! Tokens are HS256 JWTs issued elsewhere; this service only verifies them.
//! Handlers opt in by taking an `AdminIdentity` argument.

use crate::{errors::AppError, state::AppState};
use axum::{
    Json,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::IntoResponse,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// JWT claims carried by administrator tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "adminId")]
    pub admin_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry (seconds since epoch). Checked when present.
    #[serde(default)]
    pub exp: Option<u64>,
}

/// Verification material for administrator tokens.
#[derive(Clone)]
pub struct AdminKeys {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl AdminKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

/// The administrator behind a verified bearer token.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub admin_id: String,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let claims = state.keys.verify(token).map_err(|err| {
            debug!(error = %err, "rejected administrator token");
            AppError::unauthorized("invalid or expired token")
        })?;

        if claims.admin_id.trim().is_empty() {
            return Err(AppError::unauthorized("token carries no administrator id"));
        }

        Ok(Self {
            admin_id: claims.admin_id,
            email: claims.email,
        })
    }
}

/// `GET /api/admin/verify`
pub async fn verify(admin: AdminIdentity) -> impl IntoResponse {
    Json(json!({ "success": true, "admin": admin }))
}

#[cfg(test)]
pub(crate) fn token_for(secret: &str, admin_id: &str, exp: Option<u64>) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        admin_id: admin_id.to_string(),
        email: Some(format!("{admin_id}@example.com")),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let keys = AdminKeys::new("s3cret");
        let claims = keys.verify(&token_for("s3cret", "admin-7", None)).unwrap();
        assert_eq!(claims.admin_id, "admin-7");
        assert_eq!(claims.email.as_deref(), Some("admin-7@example.com"));
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let keys = AdminKeys::new("s3cret");
        assert!(keys.verify(&token_for("other", "admin-7", None)).is_err());

        let past = jsonwebtoken::get_current_timestamp() - 3_600;
        assert!(keys.verify(&token_for("s3cret", "admin-7", Some(past))).is_err());
    }
}
