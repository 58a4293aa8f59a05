// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rendered pages. Templates live in `templates/` and are compiled in.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use crate::cookies::RequestCookies;

/// The survey form.
#[derive(Template)]
#[template(path = "survey.html")]
pub struct SurveyPage;

/// Shown after a submission, and to returning visitors.
#[derive(Template)]
#[template(path = "thanks.html")]
pub struct ThanksPage {
    pub name: String,
}

/// Shared error page.
#[derive(Template)]
#[template(path = "sorry.html")]
pub struct SorryPage {
    pub error_message: String,
}

/// Debug listing of request cookies.
#[derive(Template)]
#[template(path = "cookies.html")]
pub struct CookiesPage {
    pub cookies: Vec<(String, String)>,
}

impl CookiesPage {
    pub fn new(request: &RequestCookies) -> Self {
        Self {
            cookies: request
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// Renders a template as an HTML response.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                error!(error = %err, "Template render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
