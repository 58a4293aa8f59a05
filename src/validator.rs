// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Survey form validator.
//!
//! Each form field is checked by a named [`Rule`]. Rules normalize the value
//! they accept (lowercased e-mail, digits-only phone, parsed coordinates) so
//! downstream code never sees raw form input.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z ']+$").expect("valid name regex"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+\-]+@(?:[a-zA-Z0-9\-]+\.)+[a-zA-Z]{2,63}$")
        .expect("valid e-mail regex")
});

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9()+.\- ]+$").expect("valid phone regex"));

/// Validation error types.
///
/// The display text is shown to the visitor verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid name")]
    InvalidName,

    #[error("Please enter a valid e-mail address")]
    InvalidEmail,

    #[error("Please enter a valid telephone number")]
    InvalidPhone,

    #[error("There was an error determining your location eligibility")]
    InvalidLocation { field: &'static str },

    #[error("Invalid request")]
    EmptyForm,
}

/// Named validation rules for survey fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Letters, spaces and apostrophes only
    Name,
    /// `local@domain.tld`, case-folded
    Email,
    /// Digits and common punctuation, reduced to digits
    Phone,
    /// Finite floating point coordinate or accuracy
    Location(&'static str),
}

impl Rule {
    fn error(self) -> ValidationError {
        match self {
            Rule::Name => ValidationError::InvalidName,
            Rule::Email => ValidationError::InvalidEmail,
            Rule::Phone => ValidationError::InvalidPhone,
            Rule::Location(field) => ValidationError::InvalidLocation { field },
        }
    }

    /// Apply a rule to a required text field.
    pub fn check(self, raw: Option<&str>) -> Result<String, ValidationError> {
        let raw = raw.ok_or_else(|| self.error())?;
        let accepted = match self {
            Rule::Name => NAME.is_match(raw).then(|| raw.to_string()),
            Rule::Email => EMAIL.is_match(raw).then(|| raw.to_lowercase()),
            Rule::Phone => PHONE
                .is_match(raw)
                .then(|| raw.chars().filter(char::is_ascii_digit).collect::<String>())
                .filter(|digits| !digits.is_empty()),
            Rule::Location(_) => parse_finite(raw).map(|v| v.to_string()),
        };

        accepted.ok_or_else(|| {
            debug!(rule = ?self, "Field rejected");
            self.error()
        })
    }

    /// Apply a rule to a field the visitor may leave blank.
    ///
    /// Absent and empty values are both `Ok(None)`.
    pub fn check_optional(self, raw: Option<&str>) -> Result<Option<String>, ValidationError> {
        match raw {
            None | Some("") => Ok(None),
            Some(value) => self.check(Some(value)).map(Some),
        }
    }

    /// Apply a rule to an optional numeric field, yielding the parsed value.
    pub fn check_number(self, raw: Option<&str>) -> Result<Option<f64>, ValidationError> {
        match raw {
            None | Some("") => Ok(None),
            Some(value) => parse_finite(value).map(Some).ok_or_else(|| {
                debug!(rule = ?self, "Field rejected");
                self.error()
            }),
        }
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Raw survey fields as posted by the form.
///
/// Built from the decoded `(key, value)` pairs. When a key repeats, its first
/// value is kept and unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct SurveyForm {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub user_latitude: Option<String>,
    pub user_longitude: Option<String>,
    pub user_accuracy: Option<String>,
}

impl SurveyForm {
    /// True when the form carried none of the survey fields.
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none()
            && self.user_email.is_none()
            && self.user_phone.is_none()
            && self.user_latitude.is_none()
            && self.user_longitude.is_none()
            && self.user_accuracy.is_none()
    }
}

impl FromIterator<(String, String)> for SurveyForm {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut form = SurveyForm::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "user_name" => &mut form.user_name,
                "user_email" => &mut form.user_email,
                "user_phone" => &mut form.user_phone,
                "user_latitude" => &mut form.user_latitude,
                "user_longitude" => &mut form.user_longitude,
                "user_accuracy" => &mut form.user_accuracy,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        form
    }
}

/// Survey fields that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Validates a posted survey form, field by field.
#[derive(Debug, Default, Clone, Copy)]
pub struct SurveyValidator;

impl SurveyValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a complete survey form.
    ///
    /// Fields are checked in form order and the first failure is returned.
    pub fn validate(&self, form: &SurveyForm) -> Result<ValidatedFields, ValidationError> {
        if form.is_empty() {
            return Err(ValidationError::EmptyForm);
        }

        let name = Rule::Name.check(form.user_name.as_deref())?;
        let email = Rule::Email.check(form.user_email.as_deref())?;
        let phone = Rule::Phone.check_optional(form.user_phone.as_deref())?;

        let latitude = Rule::Location("user_latitude").check_number(form.user_latitude.as_deref())?;
        let longitude =
            Rule::Location("user_longitude").check_number(form.user_longitude.as_deref())?;
        let accuracy = Rule::Location("user_accuracy").check_number(form.user_accuracy.as_deref())?;

        debug!(email = %email, has_phone = phone.is_some(), "Survey form valid");
        Ok(ValidatedFields {
            name,
            email,
            phone,
            latitude,
            longitude,
            accuracy,
        })
    }

    /// Whether a `user_name` cookie value marks a completed survey.
    pub fn is_returning_name(&self, name: &str) -> bool {
        NAME.is_match(name)
    }
}
