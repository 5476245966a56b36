//! Voter session cookie.
//!
//! Browsers keep their anonymous voter token in an httpOnly cookie so that a
//! page reload maps back to the same identity. Non-browser clients send the
//! token in the `X-Voter-Token` header instead.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::VoterConfig;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: VoterConfig,
}

impl CookieHelper {
    pub fn new(config: VoterConfig) -> Self {
        Self { config }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Build the Set-Cookie value carrying the voter token.
    pub fn build_voter_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly",
            self.config.cookie_name,
            token,
            self.config.cookie_max_age_days * SECONDS_PER_DAY
        );

        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }

        // Lax so the cookie survives following a shared poll link.
        cookie.push_str("; SameSite=Lax");

        cookie
    }

    /// Append the voter cookie to response headers.
    pub fn add_voter_cookie(&self, headers: &mut HeaderMap, token: &str) {
        if let Ok(value) = HeaderValue::from_str(&self.build_voter_cookie(token)) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Extract a cookie value from request headers by name.
    pub fn extract_cookie<'a>(&self, headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|cookie_header| cookie_header.split(';'))
            .map(|s| s.trim())
            .find_map(|cookie| {
                let (cookie_name, cookie_value) = cookie.split_once('=')?;
                (cookie_name == name).then_some(cookie_value)
            })
    }

    pub fn extract_voter_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.extract_cookie(headers, &self.config.cookie_name)
            .filter(|token| !token.is_empty())
    }
}
