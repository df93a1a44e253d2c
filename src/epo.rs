//! Client for the McAfee ePO remote command API.
//!
//! ePO exposes its console commands over HTTP as
//! `GET /remote/<command>?<params>&:output=json`, authenticated with HTTP
//! basic auth. A successful call answers with a text body of the form
//!
//! ```text
//! OK:
//! <json payload>
//! ```
//!
//! while a failed command still answers `200 OK` but with
//!
//! ```text
//! Error <code> :
//! <message>
//! ```
//!
//! [`parse_remote_response`] turns both shapes into a `Result`. The typed
//! wrappers ([`EpoClient::apply_tag`], [`EpoClient::wakeup_agent`],
//! [`EpoClient::find_system`]) cover the three commands the workflow uses.
//!
//! ## Commands
//!
//! | Method | Command | Parameters |
//! |--------|---------|------------|
//! | [`EpoClient::apply_tag`] | `system.applyTag` | `names`, `tagName` |
//! | [`EpoClient::wakeup_agent`] | `system.wakeupAgent` | `names` |
//! | [`EpoClient::find_system`] | `system.find` | `searchText` |

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{build_http_client, text_or_api_error};
use crate::config::{EpoConfig, parse_base_url};
use crate::error::{Result, SrpError};

/// Console page that shows a single managed system.
const SYSTEM_DETAIL_PATH: &str = "core/orionTableDetail.do";

// ── Response types ─────────────────────────────────────────────────────

/// A managed system as returned by `system.find`.
///
/// ePO keys each property by `<table>.<column>`. Only the properties that go
/// into the case note are modelled; the rest are ignored. Properties ePO
/// has not collected yet (e.g. for a freshly deployed agent) are `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct EpoSystem {
    #[serde(rename = "EPOComputerProperties.ComputerName", default)]
    pub computer_name: Option<String>,

    #[serde(rename = "EPOComputerProperties.IPHostName", default)]
    pub ip_host_name: Option<String>,

    #[serde(rename = "EPOComputerProperties.IPAddress", default)]
    pub ip_address: Option<String>,

    #[serde(rename = "EPOComputerProperties.OSType", default)]
    pub os_type: Option<String>,

    #[serde(rename = "EPOComputerProperties.OSVersion", default)]
    pub os_version: Option<String>,

    #[serde(rename = "EPOComputerProperties.OSPlatform", default)]
    pub os_platform: Option<String>,

    #[serde(rename = "EPOLeafNode.AgentGUID", default)]
    pub agent_guid: Option<String>,

    /// Internal id of the system's tree node. This is the `uid` the console
    /// expects in its system detail URL.
    #[serde(rename = "EPOComputerProperties.ParentID")]
    pub parent_id: i64,
}

impl EpoSystem {
    /// Formats the single-line summary attached to a case, ending with the
    /// console link to this system.
    pub fn case_note(&self, link: &Url) -> String {
        fn field(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }

        format!(
            "Name: {} Hostname: {} IP Address: {} OS: {} OS Version: {} OS Platform: {} \
             Agent GUID: {} To view system in ePO: {}",
            field(&self.computer_name),
            field(&self.ip_host_name),
            field(&self.ip_address),
            field(&self.os_type),
            field(&self.os_version),
            field(&self.os_platform),
            field(&self.agent_guid),
            link,
        )
    }
}

// ── Response parsing ───────────────────────────────────────────────────

/// Parses a remote command response body.
///
/// `OK:` with nothing after it yields `Value::Null` (some commands have no
/// payload). An `Error <code> :` header becomes [`SrpError::Epo`]; anything
/// else is reported as an unrecognized response with code `-1`.
pub fn parse_remote_response(command: &str, body: &str) -> Result<Value> {
    let body = body.trim_start();

    if let Some(rest) = body.strip_prefix("OK:") {
        let payload = rest.trim();
        if payload.is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(payload)?);
    }

    if let Some(rest) = body.strip_prefix("Error ") {
        let (header, message) = rest.split_once(':').unwrap_or((rest, ""));
        let code = header.trim().parse::<i32>().unwrap_or(-1);
        return Err(SrpError::Epo {
            command: command.to_string(),
            code,
            message: message.trim().to_string(),
        });
    }

    Err(SrpError::Epo {
        command: command.to_string(),
        code: -1,
        message: format!("unrecognized response: {}", body.trim()),
    })
}

// ── Client ─────────────────────────────────────────────────────────────

/// Authenticated client for the ePO remote command API.
pub struct EpoClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl EpoClient {
    /// Builds a client from the `[epo]` config section.
    pub fn new(config: &EpoConfig) -> Result<Self> {
        Ok(EpoClient {
            client: build_http_client("epo", config.accept_invalid_certs)?,
            base_url: parse_base_url("epo.url", &config.url)?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Runs a remote command and returns its decoded JSON payload.
    ///
    /// Parameters are sent as query pairs; `:output=json` is always added.
    pub async fn call(&self, command: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut url = self.remote_url(command)?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair(":output", "json");

        tracing::debug!(command, "calling ePO remote command");
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let body = text_or_api_error(resp).await?;
        parse_remote_response(command, &body)
    }

    fn remote_url(&self, command: &str) -> Result<Url> {
        self.base_url
            .join("remote/")
            .and_then(|u| u.join(command))
            .map_err(|e| SrpError::Config {
                message: format!("cannot build ePO URL for {command}"),
                source: Some(Box::new(e)),
            })
    }

    /// Applies an existing ePO tag to the named system(s).
    ///
    /// Returns the number of systems ePO reports as tagged. The tag must
    /// already be defined in ePO; an unknown tag is an [`SrpError::Epo`].
    pub async fn apply_tag(&self, names: &str, tag: &str) -> Result<u64> {
        let value = self
            .call("system.applyTag", &[("names", names), ("tagName", tag)])
            .await?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Sends an agent wake-up call to the named system(s) and returns ePO's
    /// textual summary of the result.
    pub async fn wakeup_agent(&self, names: &str) -> Result<String> {
        let value = self.call("system.wakeupAgent", &[("names", names)]).await?;
        Ok(match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    /// Searches managed systems by name, IP address, or other identifying text.
    pub async fn find_system(&self, search_text: &str) -> Result<Vec<EpoSystem>> {
        let value = self
            .call("system.find", &[("searchText", search_text)])
            .await?;
        tracing::debug!(payload = %value, "system.find result");
        Ok(serde_json::from_value(value)?)
    }

    /// Builds the console URL that opens the detail page of a system.
    pub fn system_link(&self, parent_id: i64) -> Result<Url> {
        let mut url = self
            .base_url
            .join(SYSTEM_DETAIL_PATH)
            .map_err(|e| SrpError::Config {
                message: "cannot build ePO system link".to_string(),
                source: Some(Box::new(e)),
            })?;
        url.query_pairs_mut()
            .append_pair("nodeType", "4")
            .append_pair("selectedTab", "SYSTEMS")
            .append_pair("nodeIDs", "")
            .append_pair("id", "ComputerMgmt.computer.datasource")
            .append_pair("datasourceAttr", "ComputerMgmt.computer.datasource")
            .append_pair("uid", &parent_id.to_string())
            .append_pair("index", "0")
            .append_pair("absoluteIndex", "0")
            .append_pair("rt", "epo.rt.computer");
        Ok(url)
    }
}
