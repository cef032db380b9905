//! Client-held session state: the signed identity token, the one-shot flash notice and the
//! short-lived checkout capability.

pub mod checkout;
pub mod flash;
pub mod token;

use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::AppConfig;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";
pub const CHECKOUT_COOKIE: &str = "can_pay";

/// A root-scoped, HttpOnly, lax cookie.
pub fn cookie(name: &'static str, value: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build()
}

/// Removal template; the path must match the one the cookie was set with.
pub fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}
