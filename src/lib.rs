// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Survey Form
//!
//! This crate serves a single-page survey that collects a visitor's name,
//! e-mail, optional telephone number and optional geolocation, and records
//! each entry in a time-series store:
//!
//! - Field validation through named rules (name, e-mail, phone, location)
//! - Returning visitors recognised by their `user_name` cookie
//! - One entry per e-mail per dedup window (24h default)
//! - InfluxDB 1.x line-protocol writes, or an in-memory store
//! - Shared error page, clearing cookies on 400/425/500

pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pages;
pub mod recorder;
pub mod store;
pub mod validator;

pub use config::Config;
pub use cookies::{CookieChange, CookieChanges, RequestCookies};
pub use error::{ErrorPage, SurveyError};
pub use handlers::{router, AppState};
pub use recorder::{RecordError, SubmissionRecorder};
pub use store::{Submission, SubmissionStore};
pub use validator::{Rule, SurveyValidator, ValidationError};
