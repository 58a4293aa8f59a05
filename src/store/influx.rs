// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! InfluxDB 1.x backend.
//!
//! Submissions are written as one line-protocol point per entry, tagged by
//! e-mail. The duplicate check is an InfluxQL query bounded by `now() - window`.

use super::{StoreError, Submission};
use crate::config::StoreConfig;
use serde::Deserialize;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// InfluxDB HTTP API client.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: reqwest::Client,
    write_url: Url,
    query_url: Url,
    database: String,
    measurement: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxStore {
    /// Create a client for the configured server. No request is made here.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&config.url).map_err(|source| StoreError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;

        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(StoreError::InvalidUrl {
                url: config.url.clone(),
                source: url::ParseError::EmptyHost,
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            write_url: endpoint(&base, "write"),
            query_url: endpoint(&base, "query"),
            database: config.database.clone(),
            measurement: config.measurement.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    /// Whether `email` has a point newer than `window`.
    pub async fn has_recent_entry(&self, email: &str, window: Duration) -> Result<bool, StoreError> {
        let query = dedup_query(&self.measurement, email, window);
        debug!(query = %query, "Checking for recent submission");

        let request = self
            .client
            .get(self.query_url.clone())
            .query(&[("db", self.database.as_str()), ("q", query.as_str())]);
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Duplicate check rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: QueryResponse = response.json().await?;
        body.has_rows()
    }

    /// Write one submission as a line-protocol point.
    pub async fn write(&self, submission: &Submission) -> Result<(), StoreError> {
        let line = line_protocol(&self.measurement, submission);
        debug!(line = %line, "Writing submission");

        let request = self
            .client
            .post(self.write_url.clone())
            .query(&[("db", self.database.as_str()), ("precision", "ns")])
            .body(line);
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Write rejected");
            Err(StoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn endpoint(base: &Url, name: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url
}

/// Body of a `/query` response.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    fn has_rows(self) -> Result<bool, StoreError> {
        if let Some(error) = self.error {
            return Err(StoreError::Query(error));
        }

        let mut found = false;
        for result in self.results {
            if let Some(error) = result.error {
                return Err(StoreError::Query(error));
            }
            found |= result.series.iter().any(|s| !s.values.is_empty());
        }
        Ok(found)
    }
}

/// InfluxQL lookup for an e-mail inside the dedup window.
pub fn dedup_query(measurement: &str, email: &str, window: Duration) -> String {
    format!(
        "SELECT \"name\" FROM \"{}\" WHERE \"email\" = '{}' AND time > now() - {}s LIMIT 1",
        escape_identifier(measurement),
        escape_literal(email),
        window.as_secs()
    )
}

/// Encode a submission as a single line-protocol point.
///
/// Absent optional fields are omitted. The timestamp is in nanoseconds.
pub fn line_protocol(measurement: &str, submission: &Submission) -> String {
    let mut line = format!(
        "{},email={} name=\"{}\",ip=\"{}\"",
        escape_measurement(measurement),
        escape_tag(&submission.email),
        escape_field_string(&submission.name),
        submission.ip
    );

    let floats = [
        ("latitude", submission.latitude),
        ("longitude", submission.longitude),
        ("accuracy", submission.accuracy),
    ];
    for (key, value) in floats {
        if let Some(value) = value {
            let _ = write!(line, ",{key}={value}");
        }
    }

    if let Some(phone) = &submission.phone {
        let _ = write!(line, ",phone=\"{}\"", escape_field_string(phone));
    }

    if let Some(nanos) = submission.received_at.timestamp_nanos_opt() {
        let _ = write!(line, " {nanos}");
    }

    line
}

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_field_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_identifier(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::net::{IpAddr, Ipv4Addr};

    fn submission() -> Submission {
        Submission {
            name: "Miles O'Brien".to_string(),
            email: "miles@example.com".to_string(),
            phone: None,
            latitude: None,
            longitude: None,
            accuracy: None,
            ip: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
            received_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_line_protocol_minimal() {
        assert_eq!(
            line_protocol("survey", &submission()),
            "survey,email=miles@example.com name=\"Miles O'Brien\",ip=\"192.0.2.10\" 1700000000000000000"
        );
    }

    #[test]
    fn test_line_protocol_with_optional_fields() {
        let mut entry = submission();
        entry.latitude = Some(51.5);
        entry.longitude = Some(-0.125);
        entry.accuracy = Some(20.0);
        entry.phone = Some("0155501099".to_string());

        assert_eq!(
            line_protocol("survey", &entry),
            "survey,email=miles@example.com name=\"Miles O'Brien\",ip=\"192.0.2.10\",latitude=51.5,longitude=-0.125,accuracy=20,phone=\"0155501099\" 1700000000000000000"
        );
    }

    #[test]
    fn test_line_protocol_escaping() {
        let mut entry = submission();
        entry.name = "say \"hi\"".to_string();
        entry.email = "a,b=c d".to_string();

        let line = line_protocol("survey entries", &entry);
        assert!(line.starts_with("survey\\ entries,email=a\\,b\\=c\\ d name=\"say \\\"hi\\\"\""));
    }

    #[test]
    fn test_dedup_query() {
        assert_eq!(
            dedup_query("survey", "ada@example.com", Duration::from_secs(86_400)),
            "SELECT \"name\" FROM \"survey\" WHERE \"email\" = 'ada@example.com' AND time > now() - 86400s LIMIT 1"
        );
        assert!(dedup_query("survey", "o'hara@example.com", Duration::from_secs(60))
            .contains("'o\\'hara@example.com'"));
    }

    #[test]
    fn test_query_response_rows() {
        let empty: QueryResponse =
            serde_json::from_str(r#"{"results":[{"statement_id":0}]}"#).unwrap();
        assert!(!empty.has_rows().unwrap());

        let found: QueryResponse = serde_json::from_str(
            r#"{"results":[{"statement_id":0,"series":[{"name":"survey","columns":["time","name"],"values":[["2024-01-01T00:00:00Z","Ada"]]}]}]}"#,
        )
        .unwrap();
        assert!(found.has_rows().unwrap());
    }

    #[test]
    fn test_query_response_error() {
        let failed: QueryResponse = serde_json::from_str(
            r#"{"results":[{"statement_id":0,"error":"database not found: survey"}]}"#,
        )
        .unwrap();
        assert!(matches!(failed.has_rows(), Err(StoreError::Query(_))));
    }

    #[test]
    fn test_endpoints() {
        let base = Url::parse("http://127.0.0.1:8086").unwrap();
        assert_eq!(endpoint(&base, "write").as_str(), "http://127.0.0.1:8086/write");

        let prefixed = Url::parse("https://metrics.example.com/influx/").unwrap();
        assert_eq!(
            endpoint(&prefixed, "query").as_str(),
            "https://metrics.example.com/influx/query"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = StoreConfig {
            url: "ftp://127.0.0.1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            InfluxStore::new(&config),
            Err(StoreError::InvalidUrl { .. })
        ));
    }
}
