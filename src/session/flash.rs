use axum_extra::extract::PrivateCookieJar;
use serde::Serialize;
use utoipa::ToSchema;

use super::{FLASH_COOKIE, removal};
use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A notice shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        let tag = match self.kind {
            FlashKind::Success => "s",
            FlashKind::Error => "e",
        };
        format!("{tag}:{}", self.message)
    }

    fn decode(raw: &str) -> Option<Self> {
        let (tag, message) = raw.split_once(':')?;
        match tag {
            "s" => Some(Flash::success(message)),
            "e" => Some(Flash::error(message)),
            _ => None,
        }
    }

    /// Attaches the notice to the outgoing response, replacing any unread one.
    pub fn set(self, jar: PrivateCookieJar, config: &AppConfig) -> PrivateCookieJar {
        jar.add(super::cookie(FLASH_COOKIE, self.encode(), config))
    }

    /// Reads the pending notice and clears it.
    pub fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Flash>) {
        match jar.get(FLASH_COOKIE) {
            Some(cookie) => {
                let flash = Flash::decode(cookie.value());
                (jar.remove(removal(FLASH_COOKIE)), flash)
            }
            None => (jar, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    #[test]
    fn encoding_round_trips_messages_with_separators() {
        let flash = Flash::error("Invalid Discount range: 10-90");
        assert_eq!(Flash::decode(&flash.encode()), Some(flash));
        assert_eq!(Flash::decode("x:whatever"), None);
    }

    #[test]
    fn take_reads_once() {
        let config = AppConfig::for_tests("postgres://unused", "flash-secret");
        let jar = PrivateCookieJar::new(Key::generate());
        let jar = Flash::success("Products added successfully").set(jar, &config);

        let (jar, first) = Flash::take(jar);
        assert_eq!(first, Some(Flash::success("Products added successfully")));

        let (_, second) = Flash::take(jar);
        assert_eq!(second, None);
    }
}
