//! Client for the LogRhythm Case API.
//!
//! Only the two case operations the workflow needs are covered:
//!
//! - [`CaseClient::add_note`]: POST `cases/{id}/evidence/note/`
//! - [`CaseClient::change_status`]: PUT `cases/{id}/actions/changeStatus/`
//!
//! Both authenticate with a bearer token. The case id is inserted as a single
//! percent-encoded path segment, so ids read from disk cannot alter the path.

use reqwest::{Client, Method, Url};
use serde::Serialize;

use crate::client::{build_http_client, text_or_api_error};
use crate::config::{CaseApiConfig, parse_base_url};
use crate::error::{Result, SrpError};

/// Case lifecycle states accepted by `changeStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Created = 1,
    Completed = 2,
    Incident = 3,
    Mitigated = 4,
    Resolved = 5,
}

impl CaseStatus {
    /// The numeric code the Case API expects.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaseStatus::Created => "Created",
            CaseStatus::Completed => "Completed",
            CaseStatus::Incident => "Incident",
            CaseStatus::Mitigated => "Mitigated",
            CaseStatus::Resolved => "Resolved",
        };
        f.write_str(name)
    }
}

// ── Request types ──────────────────────────────────────────────────────

/// Body of the add-note endpoint.
#[derive(Debug, Serialize)]
pub struct NoteRequest<'a> {
    pub text: &'a str,
}

/// Body of the change-status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    pub status_number: u8,
}

// ── Client ─────────────────────────────────────────────────────────────

/// Authenticated client for the Case API.
pub struct CaseClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl CaseClient {
    /// Builds a client from the `[case_api]` config section.
    pub fn new(config: &CaseApiConfig) -> Result<Self> {
        Ok(CaseClient {
            client: build_http_client("case_api", config.accept_invalid_certs)?,
            base_url: parse_base_url("case_api.url", &config.url)?,
            token: config.token.clone(),
        })
    }

    /// Appends a text note to the case's evidence.
    pub async fn add_note(&self, case_id: &str, text: &str) -> Result<()> {
        let url = self.case_url(case_id, &["evidence", "note"])?;
        self.send(Method::POST, url, &NoteRequest { text }).await
    }

    /// Moves the case to `status`.
    pub async fn change_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        let url = self.case_url(case_id, &["actions", "changeStatus"])?;
        let body = ChangeStatusRequest {
            status_number: status.code(),
        };
        self.send(Method::PUT, url, &body).await
    }

    /// Builds `<base>/cases/<case_id>/<tail...>/`. The trailing slash is
    /// part of the Case API routes.
    fn case_url(&self, case_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                SrpError::config(format!(
                    "case_api.url cannot be used as a base URL: {}",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().push("cases").push(case_id);
            segments.extend(tail);
            segments.push("");
        }
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, url: Url, body: &B) -> Result<()> {
        tracing::debug!(%method, %url, "calling Case API");
        let resp = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .json(body)
            .send()
            .await?;
        text_or_api_error(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> CaseClient {
        CaseClient::new(&CaseApiConfig {
            url: "https://pm.example.com:8501/lr-case-api/".to_string(),
            token: "tok".to_string(),
            accept_invalid_certs: false,
        })
        .unwrap()
    }

    #[test]
    fn status_codes_match_case_api() {
        assert_eq!(CaseStatus::Created.code(), 1);
        assert_eq!(CaseStatus::Completed.code(), 2);
        assert_eq!(CaseStatus::Incident.code(), 3);
        assert_eq!(CaseStatus::Mitigated.code(), 4);
        assert_eq!(CaseStatus::Resolved.code(), 5);
    }

    #[test]
    fn change_status_body_uses_status_number() {
        let body = ChangeStatusRequest {
            status_number: CaseStatus::Mitigated.code(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "statusNumber": 4 })
        );
    }

    #[test]
    fn note_body_escapes_text() {
        // Quotes and newlines must survive as JSON escapes, not break the body.
        let body = NoteRequest {
            text: "said \"hi\"\nthen left",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"text":"said \"hi\"\nthen left"}"#);
    }

    #[test]
    fn note_url_has_trailing_slash() {
        let url = test_client()
            .case_url("CASE-99", &["evidence", "note"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://pm.example.com:8501/lr-case-api/cases/CASE-99/evidence/note/"
        );
    }

    #[test]
    fn base_without_trailing_slash_still_nests_under_api_root() {
        let client = CaseClient::new(&CaseApiConfig {
            url: "https://pm.example.com:8501/lr-case-api".to_string(),
            token: "tok".to_string(),
            accept_invalid_certs: false,
        })
        .unwrap();
        let url = client
            .case_url("7", &["actions", "changeStatus"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://pm.example.com:8501/lr-case-api/cases/7/actions/changeStatus/"
        );
    }

    #[test]
    fn case_id_is_a_single_encoded_segment() {
        let url = test_client()
            .case_url("../admin?x=1", &["evidence", "note"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://pm.example.com:8501/lr-case-api/cases/..%2Fadmin%3Fx=1/evidence/note/"
        );
    }

    #[test]
    fn status_displays_name() {
        assert_eq!(CaseStatus::Mitigated.to_string(), "Mitigated");
    }
}
