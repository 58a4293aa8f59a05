// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Visitor cookie state.
//!
//! Handlers never touch `Set-Cookie` headers directly. They return a
//! [`CookieChanges`] list next to their page, and the list is encoded into
//! headers when the response is built.

use crate::validator::ValidatedFields;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use cookie::Cookie;
use std::convert::Infallible;
use std::time::Duration;
use tracing::warn;

pub const USER_NAME: &str = "user_name";
pub const USER_EMAIL: &str = "user_email";
pub const USER_PHONE: &str = "user_phone";
pub const USER_LATITUDE: &str = "user_latitude";
pub const USER_LONGITUDE: &str = "user_longitude";
pub const USER_ACCURACY: &str = "user_accuracy";

/// Cookies sent with the current request, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies(Vec<(String, String)>);

impl RequestCookies {
    /// Parse every `Cookie` header, skipping malformed pairs.
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let mut pairs = Vec::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse_encoded(raw).flatten() {
                pairs.push((cookie.name().to_string(), cookie.value().to_string()));
            }
        }
        Self(pairs)
    }

    /// First value sent under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Distinct cookie names, first occurrence order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in self.iter() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// A single cookie mutation to apply to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set {
        name: String,
        value: String,
        max_age: Duration,
    },
    Remove {
        name: String,
    },
}

impl CookieChange {
    fn to_header(&self) -> Option<HeaderValue> {
        let cookie = match self {
            CookieChange::Set {
                name,
                value,
                max_age,
            } => {
                let secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
                Cookie::build((name.clone(), value.clone()))
                    .path("/")
                    .max_age(cookie::time::Duration::seconds(secs))
                    .build()
            }
            CookieChange::Remove { name } => {
                let mut cookie = Cookie::build((name.clone(), "")).path("/").build();
                cookie.make_removal();
                cookie
            }
        };

        match HeaderValue::from_str(&cookie.encoded().to_string()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(cookie = %cookie.name(), error = %err, "Dropping unencodable cookie");
                None
            }
        }
    }
}

/// Ordered cookie mutations returned alongside a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieChanges(Vec<CookieChange>);

impl CookieChanges {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<String>, max_age: Duration) -> Self {
        self.0.push(CookieChange::Set {
            name: name.to_string(),
            value: value.into(),
            max_age,
        });
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.0.push(CookieChange::Remove {
            name: name.to_string(),
        });
        self
    }

    /// Remove every cookie the visitor sent.
    pub fn clear_all(request: &RequestCookies) -> Self {
        request
            .names()
            .into_iter()
            .fold(Self::none(), |changes, name| changes.remove(name))
    }

    /// Cookies mirroring an accepted submission.
    ///
    /// Name and e-mail are always set; the rest only when the visitor gave them.
    pub fn visitor_set(fields: &ValidatedFields, max_age: Duration) -> Self {
        let mut changes = Self::none()
            .set(USER_NAME, fields.name.clone(), max_age)
            .set(USER_EMAIL, fields.email.clone(), max_age);

        if let Some(phone) = &fields.phone {
            changes = changes.set(USER_PHONE, phone.clone(), max_age);
        }

        let location = [
            (USER_LATITUDE, fields.latitude),
            (USER_LONGITUDE, fields.longitude),
            (USER_ACCURACY, fields.accuracy),
        ];
        for (name, value) in location {
            if let Some(value) = value {
                changes = changes.set(name, value.to_string(), max_age);
            }
        }

        changes
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookieChange> {
        self.0.iter()
    }
}

impl IntoResponseParts for CookieChanges {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for change in &self.0 {
            if let Some(value) = change.to_header() {
                res.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn fields() -> ValidatedFields {
        ValidatedFields {
            name: "Miles O'Brien".to_string(),
            email: "miles@example.com".to_string(),
            phone: Some("5550109".to_string()),
            latitude: Some(51.5),
            longitude: Some(-0.125),
            accuracy: Some(20.0),
        }
    }

    #[test]
    fn test_parse_request_cookies() {
        let cookies = RequestCookies::from_headers(&headers("user_name=Miles%20O'Brien; theme=dark"));
        assert_eq!(cookies.get(USER_NAME), Some("Miles O'Brien"));
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.get(USER_EMAIL), None);
        assert_eq!(cookies.names(), vec!["user_name", "theme"]);
    }

    #[test]
    fn test_no_cookie_header() {
        let cookies = RequestCookies::from_headers(&HeaderMap::new());
        assert!(cookies.is_empty());
    }

    #[test]
    fn test_visitor_set_full() {
        let changes = CookieChanges::visitor_set(&fields(), Duration::from_secs(2_592_000));
        assert_eq!(changes.len(), 6);
        assert!(changes.iter().all(|c| matches!(
            c,
            CookieChange::Set { max_age, .. } if *max_age == Duration::from_secs(2_592_000)
        )));
    }

    #[test]
    fn test_visitor_set_skips_absent_fields() {
        let mut partial = fields();
        partial.phone = None;
        partial.accuracy = None;
        let changes = CookieChanges::visitor_set(&partial, Duration::from_secs(60));
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn test_set_header_is_encoded() {
        let change = CookieChange::Set {
            name: USER_NAME.to_string(),
            value: "Miles O'Brien".to_string(),
            max_age: Duration::from_secs(2_592_000),
        };
        let header = change.to_header().unwrap();
        let header = header.to_str().unwrap();
        assert!(header.starts_with("user_name=Miles%20O"));
        assert!(header.contains("Max-Age=2592000"));
        assert!(header.contains("Path=/"));
    }

    #[test]
    fn test_clear_all_removes_each_request_cookie() {
        let cookies = RequestCookies::from_headers(&headers("a=1; b=2; a=3"));
        let changes = CookieChanges::clear_all(&cookies);
        assert_eq!(
            changes.iter().cloned().collect::<Vec<_>>(),
            vec![
                CookieChange::Remove { name: "a".to_string() },
                CookieChange::Remove { name: "b".to_string() },
            ]
        );

        let header = changes.iter().next().unwrap().to_header().unwrap();
        assert!(header.to_str().unwrap().contains("Max-Age=0"));
    }
}
