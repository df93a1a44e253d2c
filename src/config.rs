//! Runtime configuration, loaded once per invocation.
//!
//! Everything the workflow needs to reach ePO and the Case API lives in a
//! single [`Config`] value that is passed to the client constructors. The
//! file is TOML; secrets may be left out of it and supplied from the
//! environment instead (the binary reads `EPO_PASSWORD` and `LR_CASE_TOKEN`
//! through clap and hands them to [`Config::with_secrets`]).
//!
//! ```toml
//! output_root = "/var/lib/logrhythm/srp"
//!
//! [epo]
//! url = "https://epo.example.com:8443"
//! username = "srp"
//!
//! [case_api]
//! url = "https://pm.example.com:8501/lr-case-api/"
//!
//! [workflow]
//! wake_agent = false
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;

use crate::error::{Result, SrpError};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding one sub-directory per alarm id, each with a
    /// `case.txt` written by the case-creation response.
    pub output_root: PathBuf,
    pub epo: EpoConfig,
    pub case_api: CaseApiConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Connection settings for the ePO remote command API.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpoConfig {
    /// Console base URL, e.g. `https://epo.example.com:8443`. Also used to
    /// build the system deep link placed in case notes.
    pub url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Skip TLS certificate validation. Off unless explicitly set.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Connection settings for the LogRhythm Case API.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseApiConfig {
    /// API root, e.g. `https://pm.example.com:8501/lr-case-api/`.
    pub url: String,
    /// Bearer token for the Case API.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Toggles for optional workflow steps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Send an agent wake-up after tagging. The wake-up blocks on ePO for
    /// roughly a minute, so it is off by default.
    #[serde(default)]
    pub wake_agent: bool,
}

// Secrets stay out of Debug output so configs can be logged safely.
impl fmt::Debug for EpoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpoConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl fmt::Debug for CaseApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseApiConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl Config {
    /// Reads and parses a TOML configuration file. The result is not yet
    /// validated; call [`Config::validate`] once secrets are applied.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SrpError::Config {
            message: format!("cannot read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            SrpError::Config { source, .. } => SrpError::Config {
                message: format!("invalid TOML in {}", path.display()),
                source,
            },
            other => other,
        })
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SrpError::Config {
            message: "invalid TOML".to_string(),
            source: Some(Box::new(e)),
        })
    }

    /// Overrides secrets with values supplied outside the file. `None`
    /// leaves the file's value in place.
    pub fn with_secrets(mut self, epo_password: Option<String>, case_token: Option<String>) -> Self {
        if let Some(password) = epo_password {
            self.epo.password = password;
        }
        if let Some(token) = case_token {
            self.case_api.token = token;
        }
        self
    }

    /// Checks that both API URLs parse and that credentials are present.
    pub fn validate(&self) -> Result<()> {
        parse_base_url("epo.url", &self.epo.url)?;
        parse_base_url("case_api.url", &self.case_api.url)?;

        if self.epo.username.is_empty() {
            return Err(SrpError::config("epo.username must be set"));
        }
        if self.epo.password.is_empty() {
            return Err(SrpError::config(
                "epo.password must be set in the file or via EPO_PASSWORD",
            ));
        }
        if self.case_api.token.is_empty() {
            return Err(SrpError::config(
                "case_api.token must be set in the file or via LR_CASE_TOKEN",
            ));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(SrpError::config("output_root must not be empty"));
        }
        Ok(())
    }
}

/// Parses a configured base URL and forces a trailing slash so that
/// `Url::join` appends to the path instead of replacing its last segment.
pub(crate) fn parse_base_url(key: &str, raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| SrpError::Config {
        message: format!("{key} is not a valid URL: {raw}"),
        source: Some(Box::new(e)),
    })?;
    if url.cannot_be_a_base() {
        return Err(SrpError::config(format!("{key} cannot be used as a base URL: {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
