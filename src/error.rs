// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types and the shared error page.

use crate::cookies::{CookieChanges, RequestCookies};
use crate::metrics::Outcome;
use crate::pages::SorryPage;
use crate::recorder::RecordError;
use crate::store::StoreError;
use crate::validator::ValidationError;
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, info};

/// Everything a survey request can fail with.
///
/// The display text is the message shown on the error page.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Page not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Something went wrong")]
    Render(#[from] askama::Error),
}

impl SurveyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Record(RecordError::Duplicate) => too_early(),
            Self::Record(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// 400, 425 and 500 wipe the visitor's cookies so they can start over.
    pub fn clears_cookies(&self) -> bool {
        !matches!(self, Self::NotFound | Self::MethodNotAllowed)
    }

    /// Submission outcome for metrics, if this error ends a submission.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Invalid(_) => Some(Outcome::Invalid),
            Self::Record(RecordError::Duplicate) => Some(Outcome::Duplicate),
            Self::Record(_) => Some(Outcome::StoreError),
            Self::NotFound | Self::MethodNotAllowed | Self::Render(_) => None,
        }
    }

    /// Build the error page, clearing the request's cookies where required.
    pub fn into_page(self, request: &RequestCookies) -> ErrorPage {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "Request failed");
        } else {
            info!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let cookies = if self.clears_cookies() {
            CookieChanges::clear_all(request)
        } else {
            CookieChanges::none()
        };

        ErrorPage {
            status,
            message: self.to_string(),
            cookies,
        }
    }
}

/// 425 has no named constant in `http`.
fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::TOO_MANY_REQUESTS)
}

/// A rendered error response.
#[derive(Debug)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
    pub cookies: CookieChanges,
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let page = SorryPage {
            error_message: self.message.clone(),
        };
        match page.render() {
            Ok(html) => (self.status, self.cookies, Html(html)).into_response(),
            Err(err) => {
                error!(error = %err, "Error page render failed");
                (self.status, self.cookies, self.message).into_response()
            }
        }
    }
}

/// Failures while assembling application state.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn request_cookies() -> RequestCookies {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("user_name=Ada; user_email=ada%40example.com"),
        );
        RequestCookies::from_headers(&headers)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            SurveyError::Invalid(ValidationError::InvalidName).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SurveyError::Record(RecordError::Duplicate).status().as_u16(), 425);
        assert_eq!(
            SurveyError::Record(RecordError::Write(StoreError::Query("down".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(SurveyError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            SurveyError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_store_details_hidden_from_visitor() {
        let page = SurveyError::Record(RecordError::Write(StoreError::Query(
            "authorization failed".into(),
        )))
        .into_page(&request_cookies());
        assert_eq!(page.message, "Cannot write to database");
    }

    #[test]
    fn test_bad_request_clears_cookies() {
        let page = SurveyError::Invalid(ValidationError::InvalidEmail).into_page(&request_cookies());
        assert_eq!(page.message, "Please enter a valid e-mail address");
        assert_eq!(page.cookies.len(), 2);
    }

    #[test]
    fn test_not_found_keeps_cookies() {
        let page = SurveyError::NotFound.into_page(&request_cookies());
        assert_eq!(page.message, "Page not found");
        assert!(page.cookies.is_empty());
    }
}
