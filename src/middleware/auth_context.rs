use std::future::{ready, Ready};

use actix_web::{
    dev::Payload, error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest,
};

use crate::middleware::auth::{decode_claims, BearerToken, Claims};

#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let extensions = req.extensions();
        let user = match (extensions.get::<Claims>(), extensions.get::<BearerToken>()) {
            (Some(claims), Some(BearerToken(token))) => Ok(AuthenticatedUser::from_claims(claims, token)),
            _ => Err(ErrorUnauthorized("User not authenticated")),
        };
        ready(user)
    }
}

impl AuthenticatedUser {
    fn from_claims(claims: &Claims, token: &str) -> Self {
        AuthenticatedUser {
            user_id: claims.user_id.clone().unwrap_or_else(|| claims.sub.clone()),
            email: claims.email.clone().unwrap_or_else(|| claims.sub.clone()),
            token: token.to_string(),
        }
    }
}

/// Caller identity on routes open to guests; an invalid token counts as a guest.
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl FromRequest for OptionalUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .and_then(|token| {
                decode_claims(token)
                    .ok()
                    .map(|claims| AuthenticatedUser::from_claims(&claims, token))
            });
        ready(Ok(OptionalUser(user)))
    }
}
