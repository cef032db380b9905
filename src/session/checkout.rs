//! "Payment authorized" capability, granted by starting checkout and consumed by a
//! completed or abandoned payment attempt.

use chrono::{Duration, Utc};
use axum_extra::extract::PrivateCookieJar;
use uuid::Uuid;

use super::{CHECKOUT_COOKIE, removal};
use crate::config::AppConfig;

pub fn grant(jar: PrivateCookieJar, user_id: Uuid, config: &AppConfig) -> PrivateCookieJar {
    let expires = Utc::now() + Duration::minutes(config.checkout_ttl_minutes);
    let value = format!("{user_id}|{}", expires.timestamp());
    jar.add(super::cookie(CHECKOUT_COOKIE, value, config))
}

/// True while the capability exists, belongs to `user_id` and has not expired.
pub fn is_granted(jar: &PrivateCookieJar, user_id: Uuid) -> bool {
    let Some(cookie) = jar.get(CHECKOUT_COOKIE) else {
        return false;
    };
    let Some((owner, expires)) = cookie.value().split_once('|') else {
        return false;
    };
    let owner_matches = Uuid::parse_str(owner).is_ok_and(|owner| owner == user_id);
    let fresh = expires
        .parse::<i64>()
        .is_ok_and(|expires| expires > Utc::now().timestamp());
    owner_matches && fresh
}

pub fn revoke(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal(CHECKOUT_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn config(ttl_minutes: i64) -> AppConfig {
        let mut config = AppConfig::for_tests("postgres://unused", "checkout-secret");
        config.checkout_ttl_minutes = ttl_minutes;
        config
    }

    #[test]
    fn capability_is_bound_to_its_user() {
        let user = Uuid::new_v4();
        let jar = grant(PrivateCookieJar::new(Key::generate()), user, &config(15));
        assert!(is_granted(&jar, user));
        assert!(!is_granted(&jar, Uuid::new_v4()));
    }

    #[test]
    fn expired_or_revoked_capability_is_refused() {
        let user = Uuid::new_v4();
        let expired = grant(PrivateCookieJar::new(Key::generate()), user, &config(-1));
        assert!(!is_granted(&expired, user));

        let jar = grant(PrivateCookieJar::new(Key::generate()), user, &config(15));
        let jar = revoke(jar);
        assert!(!is_granted(&jar, user));
    }
}
