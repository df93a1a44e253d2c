//! McAfee ePO "ApplyTag" SmartResponse for LogRhythm alarms.
//!
//! Tags an endpoint in ePO, optionally wakes its agent, and, when the alarm
//! already has a LogRhythm case, annotates that case with the action and the
//! endpoint's details before marking it Mitigated.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment-supplied secrets.
//! - [`epo`]: ePO remote command API client (`system.applyTag`, etc.).
//! - [`cases`]: LogRhythm Case API client (notes, status changes).
//! - [`case_ref`]: alarm id to case id lookup on the local filesystem.
//! - [`workflow`]: the step-by-step driver and its run report.
//! - [`error`]: typed error hierarchy (`SrpError`).
//!
//! # Quick Start
//!
//! ```ignore
//! use epo_srp::config::Config;
//! use epo_srp::workflow::{InvocationRequest, Workflow};
//!
//! let config = Config::load("epo-srp.toml".as_ref())?;
//! config.validate()?;
//! let request = InvocationRequest::new("Quarantine", "HOST01 *", "12345")?;
//! let report = Workflow::from_config(&config)?.run(&request).await?;
//! ```

pub mod case_ref;
pub mod cases;
mod client;
pub mod config;
pub mod epo;
pub mod error;
pub mod workflow;
