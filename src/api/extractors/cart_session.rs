use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tower_cookies::cookie::{time::Duration, SameSite};
use tower_cookies::{Cookie, Cookies};
use tracing::Span;

use crate::domain::models::cart::Cart;

pub const CART_COOKIE: &str = "cart_session";

/// The browsing session a cart belongs to. A new session id is issued as a
/// cookie when the request carries none.
pub struct CartSession(pub String);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let session_id = match cookies.get(CART_COOKIE) {
            Some(c) if is_valid_session_id(c.value()) => c.value().to_string(),
            _ => {
                let id = Cart::new_session_id();
                let mut cookie = Cookie::new(CART_COOKIE, id.clone());
                cookie.set_http_only(true);
                cookie.set_secure(true);
                cookie.set_same_site(SameSite::Lax);
                cookie.set_path("/");
                cookie.set_max_age(Duration::days(30));
                cookies.add(cookie);
                id
            }
        };

        Span::current().record("cart_session", &session_id[..8]);
        Ok(CartSession(session_id))
    }
}

fn is_valid_session_id(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_alphanumeric())
}
