//! Bearer-token auth against the customer service.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves a bearer token to the owning user id.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<String, ApiError>;
}

/// HTTP client for the customer service's token verification endpoint.
pub struct CustomerAuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl CustomerAuthClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::internal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for CustomerAuthClient {
    async fn verify_token(&self, token: &str) -> Result<String, ApiError> {
        if token.is_empty() {
            return Err(ApiError::unauthorized("Missing credentials"));
        }

        let response = self
            .client
            .post(format!("{}/api/auth", self.base_url))
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(|e| ApiError::bad_gateway(format!("customer service unreachable: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
                let id = match body.get("id") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    _ => return Err(ApiError::bad_gateway("customer service returned no id")),
                };
                debug!(user_id = %id, "token verified");
                Ok(id)
            }
            400 | 401 => Err(ApiError::unauthorized("Invalid token")),
            403 => Err(ApiError::forbidden("Customer inactive")),
            404 => Err(ApiError::not_found("Customer not found")),
            status => Err(ApiError::bad_gateway(format!(
                "customer service returned {status}"
            ))),
        }
    }
}

/// The authenticated caller, extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing credentials"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing credentials"))?;

        let user_id = state.auth.verify_token(token).await?;
        Ok(AuthUser { user_id })
    }
}
