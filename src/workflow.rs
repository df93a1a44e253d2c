//! The ApplyTag SmartResponse workflow.
//!
//! One run handles one alarm:
//!
//! 1. Apply the tag to the system in ePO.
//! 2. Optionally send an agent wake-up.
//! 3. Look up the case recorded for the alarm; stop successfully if none.
//! 4. Annotate the case with the action taken.
//! 5. Attach the ePO system details to the case.
//! 6. Set the case status to Mitigated.
//!
//! Steps run strictly in order. Tagging, the case lookup, the first note and
//! the status change are fatal: a failure stops the run with
//! [`SrpError::Step`]. The wake-up and the system details note are
//! best-effort and only recorded as failed in the [`RunReport`]. Nothing is
//! retried or rolled back.

use std::fmt;
use std::path::{Component, Path};

use crate::case_ref::CaseLookup;
use crate::cases::{CaseClient, CaseStatus};
use crate::config::Config;
use crate::epo::EpoClient;
use crate::error::{Result, SrpError};

/// Note added to the case once the tag is in place.
pub const TAG_NOTE: &str = "Tag applied to endpoint in McAfee ePO & agent wake up issued..";

/// Status the case is moved to at the end of a run.
pub const FINAL_STATUS: CaseStatus = CaseStatus::Mitigated;

// ── Request ────────────────────────────────────────────────────────────

/// The normalized arguments of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    tag: String,
    system: String,
    alarm_id: String,
}

impl InvocationRequest {
    /// Validates and normalizes the raw command-line values.
    ///
    /// The system name is cut to its first whitespace-delimited token:
    /// LogRhythm passes the origin host as `"<hostname> *"`, which ePO would
    /// not find. The alarm id must be usable as a single directory name.
    pub fn new(tag: &str, system_name: &str, alarm_id: &str) -> Result<Self> {
        if tag.trim().is_empty() {
            return Err(SrpError::InvalidInput("tag must not be empty".to_string()));
        }
        let system = normalize_system_name(system_name).ok_or_else(|| {
            SrpError::InvalidInput(format!("system name '{system_name}' has no host token"))
        })?;
        if !is_single_dir_name(alarm_id) {
            return Err(SrpError::InvalidInput(format!(
                "alarm id '{alarm_id}' is not a plain directory name"
            )));
        }
        Ok(InvocationRequest {
            tag: tag.to_string(),
            system: system.to_string(),
            alarm_id: alarm_id.to_string(),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The normalized system name sent to ePO.
    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn alarm_id(&self) -> &str {
        &self.alarm_id
    }
}

/// Returns the first whitespace-delimited token of `raw`, if any.
pub fn normalize_system_name(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

fn is_single_dir_name(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !s.contains(['/', '\\'])
}

// ── Report ─────────────────────────────────────────────────────────────

/// A workflow step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ApplyTag,
    WakeAgent,
    LookupCase,
    AnnotateCase,
    AddSystemDetails,
    ChangeStatus,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ApplyTag => "apply tag",
            Step::WakeAgent => "wake agent",
            Step::LookupCase => "look up case",
            Step::AnnotateCase => "annotate case",
            Step::AddSystemDetails => "add system details",
            Step::ChangeStatus => "change status",
        };
        f.write_str(name)
    }
}

/// What happened to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Completed; the string describes the result.
    Done(String),
    /// Not run, because it is disabled or no case exists.
    Skipped,
    /// Failed without stopping the run.
    Failed(String),
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Done(detail) => write!(f, "done ({detail})"),
            StepStatus::Skipped => f.write_str("skipped"),
            StepStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No case directory exists for the alarm; only ePO was touched.
    NoCase,
    /// The case was annotated and its status changed.
    CaseUpdated { case_id: String },
}

/// Structured result of a run that did not hit a fatal error.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub request: InvocationRequest,
    pub steps: Vec<StepRecord>,
    pub outcome: Outcome,
}

impl RunReport {
    /// Status recorded for `step`, if it was reached.
    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.status)
    }

    /// True when a best-effort step failed.
    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|r| matches!(r.status, StepStatus::Failed(_)))
    }
}

// ── Driver ─────────────────────────────────────────────────────────────

/// Runs the SmartResponse against configured ePO and Case API endpoints.
pub struct Workflow {
    epo: EpoClient,
    cases: CaseClient,
    lookup: CaseLookup,
    wake_agent: bool,
}

impl Workflow {
    pub fn new(epo: EpoClient, cases: CaseClient, lookup: CaseLookup, wake_agent: bool) -> Self {
        Workflow {
            epo,
            cases,
            lookup,
            wake_agent,
        }
    }

    /// Builds both clients and the lookup from a validated config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Workflow::new(
            EpoClient::new(&config.epo)?,
            CaseClient::new(&config.case_api)?,
            CaseLookup::new(&config.output_root),
            config.workflow.wake_agent,
        ))
    }

    pub async fn run(&self, request: &InvocationRequest) -> Result<RunReport> {
        let system = request.system();
        let mut steps = Vec::with_capacity(6);

        tracing::info!(tag = request.tag(), system, "applying ePO tag");
        let tagged = self
            .epo
            .apply_tag(system, request.tag())
            .await
            .map_err(|e| e.at(Step::ApplyTag))?;
        if tagged == 0 {
            tracing::warn!(system, "ePO reported no systems tagged");
        }
        steps.push(StepRecord {
            step: Step::ApplyTag,
            status: StepStatus::Done(format!("tag '{}' applied to {system}", request.tag())),
        });

        steps.push(StepRecord {
            step: Step::WakeAgent,
            status: self.wake(system).await,
        });

        let case_id = self
            .lookup
            .find_case(request.alarm_id())
            .map_err(|e| e.at(Step::LookupCase))?;
        let Some(case_id) = case_id else {
            tracing::info!(alarm_id = request.alarm_id(), "no case recorded for alarm");
            steps.push(StepRecord {
                step: Step::LookupCase,
                status: StepStatus::Done("no case found".to_string()),
            });
            for step in [Step::AnnotateCase, Step::AddSystemDetails, Step::ChangeStatus] {
                steps.push(StepRecord {
                    step,
                    status: StepStatus::Skipped,
                });
            }
            return Ok(RunReport {
                request: request.clone(),
                steps,
                outcome: Outcome::NoCase,
            });
        };
        steps.push(StepRecord {
            step: Step::LookupCase,
            status: StepStatus::Done(format!("case {case_id}")),
        });

        tracing::info!(case_id = %case_id, "annotating case");
        self.cases
            .add_note(&case_id, TAG_NOTE)
            .await
            .map_err(|e| e.at(Step::AnnotateCase))?;
        steps.push(StepRecord {
            step: Step::AnnotateCase,
            status: StepStatus::Done("note added".to_string()),
        });

        let details = match self.add_system_details(&case_id, system).await {
            Ok(()) => StepStatus::Done("system details added".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "could not add system details to case");
                StepStatus::Failed(e.to_string())
            }
        };
        steps.push(StepRecord {
            step: Step::AddSystemDetails,
            status: details,
        });

        tracing::info!(case_id = %case_id, status = %FINAL_STATUS, "changing case status");
        self.cases
            .change_status(&case_id, FINAL_STATUS)
            .await
            .map_err(|e| e.at(Step::ChangeStatus))?;
        steps.push(StepRecord {
            step: Step::ChangeStatus,
            status: StepStatus::Done(format!("status set to {FINAL_STATUS}")),
        });

        Ok(RunReport {
            request: request.clone(),
            steps,
            outcome: Outcome::CaseUpdated { case_id },
        })
    }

    async fn wake(&self, system: &str) -> StepStatus {
        if !self.wake_agent {
            return StepStatus::Skipped;
        }
        tracing::info!(system, "sending agent wake-up");
        match self.epo.wakeup_agent(system).await {
            Ok(summary) if summary.is_empty() => StepStatus::Done(format!("wake-up sent to {system}")),
            Ok(summary) => StepStatus::Done(format!("wake-up sent to {system}: {summary}")),
            Err(e) => {
                tracing::warn!(system, error = %e, "agent wake-up failed");
                StepStatus::Failed(e.to_string())
            }
        }
    }

    /// Looks the system up in ePO and posts its summary as a case note.
    /// Only the first match is used.
    async fn add_system_details(&self, case_id: &str, system: &str) -> Result<()> {
        let found = self.epo.find_system(system).await?;
        let first = found
            .first()
            .ok_or_else(|| SrpError::SystemNotFound(system.to_string()))?;
        let link = self.epo.system_link(first.parent_id)?;
        self.cases.add_note(case_id, &first.case_note(&link)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_marker_is_stripped() {
        assert_eq!(normalize_system_name("HOST01 *"), Some("HOST01"));
    }

    #[test]
    fn any_whitespace_ends_the_host_token() {
        assert_eq!(normalize_system_name("HOST01\t* extra"), Some("HOST01"));
        assert_eq!(normalize_system_name("  HOST01 *"), Some("HOST01"));
        assert_eq!(normalize_system_name("HOST01"), Some("HOST01"));
    }

    #[test]
    fn blank_system_name_has_no_token() {
        assert_eq!(normalize_system_name("   "), None);
        assert!(InvocationRequest::new("Quarantine", " ", "1").is_err());
    }

    #[test]
    fn request_keeps_tag_and_alarm_as_given() {
        let req = InvocationRequest::new("Quarantine", "HOST01 *", "12345").unwrap();
        assert_eq!(req.tag(), "Quarantine");
        assert_eq!(req.system(), "HOST01");
        assert_eq!(req.alarm_id(), "12345");
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(InvocationRequest::new("", "HOST01", "1").is_err());
    }

    #[test]
    fn alarm_id_cannot_escape_output_root() {
        for bad in ["", ".", "..", "../12345", "a/b", "a\\b", "/etc"] {
            assert!(
                InvocationRequest::new("Quarantine", "HOST01", bad).is_err(),
                "alarm id {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn step_names_read_naturally() {
        assert_eq!(Step::ApplyTag.to_string(), "apply tag");
        assert_eq!(Step::AddSystemDetails.to_string(), "add system details");
    }

    #[test]
    fn report_detects_best_effort_failures() {
        let report = RunReport {
            request: InvocationRequest::new("T", "H", "1").unwrap(),
            steps: vec![
                StepRecord {
                    step: Step::ApplyTag,
                    status: StepStatus::Done("ok".to_string()),
                },
                StepRecord {
                    step: Step::WakeAgent,
                    status: StepStatus::Failed("timeout".to_string()),
                },
            ],
            outcome: Outcome::NoCase,
        };
        assert!(report.has_failures());
        assert_eq!(
            report.status(Step::WakeAgent),
            Some(&StepStatus::Failed("timeout".to_string()))
        );
        assert!(report.status(Step::ChangeStatus).is_none());
    }
}
