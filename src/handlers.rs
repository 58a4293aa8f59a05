// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the survey form service.
//!
//! Returning visitors are recognised by their `user_name` cookie and are
//! thanked without any store access.

use crate::config::Config;
use crate::cookies::{CookieChanges, RequestCookies, USER_NAME};
use crate::error::{ErrorPage, InitError, SurveyError};
use crate::metrics::{Outcome, SurveyMetrics};
use crate::pages::{CookiesPage, HtmlTemplate, SurveyPage, ThanksPage};
use crate::recorder::SubmissionRecorder;
use crate::store::{Submission, SubmissionStore};
use crate::validator::{SurveyForm, SurveyValidator, ValidationError};
use askama::Template;
use axum::{
    extract::{rejection::FormRejection, ConnectInfo, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared application state.
pub struct AppState {
    pub recorder: SubmissionRecorder,
    pub validator: SurveyValidator,
    pub metrics: SurveyMetrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, InitError> {
        let store = SubmissionStore::from_config(&config.store)?;
        Ok(Self {
            recorder: SubmissionRecorder::new(store, config.store.dedup_window()),
            validator: SurveyValidator::new(),
            metrics: SurveyMetrics::new()?,
            config,
        })
    }

    /// Name of a visitor who already completed the survey.
    fn returning_visitor<'a>(&self, cookies: &'a RequestCookies) -> Option<&'a str> {
        cookies
            .get(USER_NAME)
            .filter(|name| self.validator.is_returning_name(name))
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(display_survey).fallback(method_not_allowed))
        .route(
            "/submit",
            get(display_survey)
                .post(submit_survey)
                .fallback(method_not_allowed),
        )
        .route("/cookies/show", get(show_cookies).fallback(method_not_allowed))
        .route("/cookies/clear", get(clear_cookies).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/healthz", get(health).fallback(method_not_allowed));

    if state.config.metrics.enabled {
        app = app.route(
            &state.config.metrics.path,
            get(metrics).fallback(method_not_allowed),
        );
    }

    app.fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "survey-form",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /` and `GET /submit`: the form, or a thank-you for returning visitors.
pub async fn display_survey(
    State(state): State<Arc<AppState>>,
    cookies: RequestCookies,
) -> Response {
    match state.returning_visitor(&cookies) {
        Some(name) => HtmlTemplate(ThanksPage {
            name: name.to_string(),
        })
        .into_response(),
        None => HtmlTemplate(SurveyPage).into_response(),
    }
}

/// `POST /submit`: validate, dedup, record, then set the visitor cookies.
pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    cookies: RequestCookies,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    match process_submission(&state, addr, &cookies, form).await {
        Ok((outcome, changes, page)) => {
            state.metrics.record(outcome);
            (changes, page).into_response()
        }
        Err(err) => {
            if let Some(outcome) = err.outcome() {
                state.metrics.record(outcome);
            }
            err.into_page(&cookies).into_response()
        }
    }
}

async fn process_submission(
    state: &AppState,
    addr: SocketAddr,
    cookies: &RequestCookies,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<(Outcome, CookieChanges, Html<String>), SurveyError> {
    if let Some(name) = state.returning_visitor(cookies) {
        debug!(ip = %addr.ip(), "Returning visitor, skipping submission");
        let page = ThanksPage {
            name: name.to_string(),
        }
        .render()?;
        return Ok((Outcome::AlreadySubmitted, CookieChanges::none(), Html(page)));
    }

    let Form(pairs) = form.map_err(|rejection| {
        debug!(error = %rejection, "Unreadable survey form");
        ValidationError::EmptyForm
    })?;
    let form: SurveyForm = pairs.into_iter().collect();

    let fields = state.validator.validate(&form)?;
    let changes = CookieChanges::visitor_set(&fields, state.config.cookies.max_age());
    let page = ThanksPage {
        name: fields.name.clone(),
    }
    .render()?;

    let submission = Submission::new(fields, addr.ip());
    state.recorder.record(&submission).await?;

    Ok((Outcome::Accepted, changes, Html(page)))
}

/// `GET /cookies/show`: debug listing of the request's cookies.
pub async fn show_cookies(cookies: RequestCookies) -> HtmlTemplate<CookiesPage> {
    HtmlTemplate(CookiesPage::new(&cookies))
}

/// `GET /cookies/clear`: remove every cookie the visitor sent.
pub async fn clear_cookies(cookies: RequestCookies) -> (CookieChanges, &'static str) {
    (CookieChanges::clear_all(&cookies), "OK")
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn not_found(cookies: RequestCookies) -> ErrorPage {
    SurveyError::NotFound.into_page(&cookies)
}

pub async fn method_not_allowed(cookies: RequestCookies) -> ErrorPage {
    SurveyError::MethodNotAllowed.into_page(&cookies)
}
