use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::{error_response, ApiError, AppState};

/// Claims of the bearer token issued by the panel's login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == "admin")
    }
}

/// The authenticated caller, taken from `Authorization: Bearer <jwt>`.
pub struct CurrentUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    error_response(StatusCode::UNAUTHORIZED, "Invalid authorization header")
                })?;

        let claims = decode_claims(bearer.token(), &state.jwt_secret)?;
        Ok(CurrentUser(claims))
    }
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| error_response(StatusCode::UNAUTHORIZED, "Invalid token"))?;

    Ok(token_data.claims)
}

pub fn require_admin(claims: &Claims) -> Result<(), ApiError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(error_response(StatusCode::FORBIDDEN, "Administrator role required"))
    }
}
