//! CLI entry point for epo-srp, the ePO ApplyTag SmartResponse.
//!
//! LogRhythm invokes this once per alarm with the tag, the alarm's origin
//! host, and the alarm id. Settings come from a TOML file; secrets may also
//! come from the environment.
//!
//! Exit codes:
//! - 0: success, including "no case found for this alarm"
//! - 1: runtime error (config, ePO, Case API, case file)
//! - 2: argument validation error (clap handles this automatically)

use std::error::Error;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use epo_srp::config::Config;
use epo_srp::error::SrpError;
use epo_srp::workflow::{InvocationRequest, Outcome, RunReport, Step, StepStatus, Workflow};

/// Single-dash flag spellings used by existing SmartResponse definitions.
const LEGACY_FLAGS: [&str; 3] = ["-applytag", "-sysname", "-alarmid"];

#[derive(Parser)]
#[command(version, about = "McAfee ePO ApplyTag SmartResponse", long_about = None)]
struct Cli {
    /// ePO tag to apply. Must already exist in ePO.
    #[arg(long)]
    applytag: String,

    /// System name as passed by the alarm. Only the first
    /// whitespace-delimited token is used ("HOST01 *" -> "HOST01").
    #[arg(long, allow_hyphen_values = true)]
    sysname: String,

    /// LogRhythm alarm id, used to find the case recorded for the alarm.
    #[arg(long)]
    alarmid: String,

    /// Path to the TOML configuration file.
    #[arg(long, env = "EPO_SRP_CONFIG", default_value = "epo-srp.toml")]
    config: PathBuf,

    /// Also send an agent wake-up after tagging (overrides the config).
    #[arg(long)]
    wake_agent: bool,

    /// Directory holding `<alarm id>/case.txt` (overrides the config).
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// ePO password. Prefer the environment variable over the flag to keep
    /// it out of process listings.
    #[arg(long, env = "EPO_PASSWORD", hide_env_values = true)]
    epo_password: Option<String>,

    /// LogRhythm Case API bearer token.
    #[arg(long, env = "LR_CASE_TOKEN", hide_env_values = true)]
    case_token: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(legacy_args(std::env::args_os()));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut cause = e.source();
            while let Some(inner) = cause {
                eprintln!("  caused by: {inner}");
                cause = inner.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport, SrpError> {
    let request = InvocationRequest::new(&cli.applytag, &cli.sysname, &cli.alarmid)?;
    let config = load_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");

    Workflow::from_config(&config)?.run(&request).await
}

/// Loads the config file and layers CLI and environment overrides on top.
fn load_config(cli: &Cli) -> Result<Config, SrpError> {
    let mut config =
        Config::load(&cli.config)?.with_secrets(cli.epo_password.clone(), cli.case_token.clone());
    if cli.wake_agent {
        config.workflow.wake_agent = true;
    }
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Rewrites `-applytag` style flags to their `--applytag` form. Values are
/// never touched: only an argument that follows another value or flag and
/// exactly matches a legacy spelling is rewritten.
fn legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out: Vec<OsString> = Vec::new();
    let mut expects_value = false;
    for arg in args {
        let is_legacy = !expects_value
            && !out.is_empty()
            && arg.to_str().is_some_and(|a| LEGACY_FLAGS.contains(&a));
        if is_legacy {
            let mut long = OsString::from("-");
            long.push(&arg);
            out.push(long);
            expects_value = true;
        } else {
            expects_value = arg
                .to_str()
                .is_some_and(|a| a.starts_with("--") && !a.contains('=') && a != "--wake-agent");
            out.push(arg);
        }
    }
    out
}

fn print_report(report: &RunReport) {
    for line in report_lines(report) {
        println!("{line}");
    }
}

/// Progress lines for a finished run, in step order.
fn report_lines(report: &RunReport) -> Vec<String> {
    let tag = report.request.tag();
    let system = report.request.system();
    let case = match &report.outcome {
        Outcome::CaseUpdated { case_id } => case_id.as_str(),
        Outcome::NoCase => "",
    };

    let mut lines = Vec::new();
    for record in &report.steps {
        let line = match (&record.step, &record.status) {
            (_, StepStatus::Skipped) => continue,
            (step, StepStatus::Failed(reason)) => format!("{step} failed: {reason}"),
            (Step::ApplyTag, _) => format!("ePO tag: '{tag}' applied to system: {system}"),
            (Step::WakeAgent, _) => format!("Agent wakeup sent to system: {system}"),
            (Step::LookupCase, _) => match &report.outcome {
                Outcome::NoCase => "No LogRhythm case found, exiting..".to_string(),
                Outcome::CaseUpdated { .. } => format!("LogRhythm case found: {case}"),
            },
            (Step::AnnotateCase, _) => format!("Case {case} annotated"),
            (Step::AddSystemDetails, _) => format!("ePO system information added to case {case}"),
            (Step::ChangeStatus, _) => format!("Case {case} status changed to Mitigated"),
        };
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "epo-srp",
            "--applytag",
            "Quarantine",
            "--sysname",
            "HOST01 *",
            "--alarmid",
            "12345",
        ]
    }

    #[test]
    fn required_flags_parse() {
        let cli = Cli::try_parse_from(base_args()).expect("should parse required flags");
        assert_eq!(cli.applytag, "Quarantine");
        assert_eq!(cli.sysname, "HOST01 *");
        assert_eq!(cli.alarmid, "12345");
        assert!(!cli.wake_agent, "wake-up must be opt-in");
        assert!(cli.output_root.is_none());
    }

    #[test]
    fn each_required_flag_is_enforced() {
        for missing in ["--applytag", "--sysname", "--alarmid"] {
            let mut args = base_args();
            let pos = args.iter().position(|a| *a == missing).unwrap();
            args.drain(pos..pos + 2);
            assert!(
                Cli::try_parse_from(args).is_err(),
                "parsing should fail without {missing}"
            );
        }
    }

    fn legacy(args: &[&str]) -> Vec<OsString> {
        legacy_args(args.iter().map(OsString::from))
    }

    #[test]
    fn single_dash_flags_from_alarm_definitions_parse() {
        let args = legacy(&[
            "epo-srp",
            "-applytag",
            "Quarantine",
            "-sysname",
            "HOST01 *",
            "-alarmid",
            "12345",
        ]);
        let cli = Cli::try_parse_from(args).expect("single-dash flags should parse");
        assert_eq!(cli.applytag, "Quarantine");
        assert_eq!(cli.sysname, "HOST01 *");
        assert_eq!(cli.alarmid, "12345");
    }

    #[test]
    fn legacy_spellings_are_not_rewritten_as_values() {
        // A tag literally named "-sysname" stays a value.
        let args = legacy(&[
            "epo-srp",
            "--applytag",
            "-sysname",
            "--sysname",
            "HOST01",
            "-alarmid",
            "1",
        ]);
        let rendered: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            rendered,
            ["epo-srp", "--applytag", "-sysname", "--sysname", "HOST01", "--alarmid", "1"]
        );
    }

    #[test]
    fn double_dash_args_pass_through_unchanged() {
        let args = legacy(&base_args());
        let rendered: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(rendered, base_args());
    }

    fn report(steps: Vec<(Step, StepStatus)>, outcome: Outcome) -> RunReport {
        RunReport {
            request: InvocationRequest::new("Quarantine", "HOST01 *", "12345").unwrap(),
            steps: steps
                .into_iter()
                .map(|(step, status)| epo_srp::workflow::StepRecord { step, status })
                .collect(),
            outcome,
        }
    }

    fn done() -> StepStatus {
        StepStatus::Done(String::new())
    }

    #[test]
    fn no_case_run_reports_like_the_alarm_tool() {
        let report = report(
            vec![
                (Step::ApplyTag, done()),
                (Step::WakeAgent, StepStatus::Skipped),
                (Step::LookupCase, done()),
                (Step::AnnotateCase, StepStatus::Skipped),
                (Step::AddSystemDetails, StepStatus::Skipped),
                (Step::ChangeStatus, StepStatus::Skipped),
            ],
            Outcome::NoCase,
        );
        assert_eq!(
            report_lines(&report),
            [
                "ePO tag: 'Quarantine' applied to system: HOST01",
                "No LogRhythm case found, exiting..",
            ]
        );
    }

    #[test]
    fn updated_case_lines_name_the_case() {
        let report = report(
            vec![
                (Step::ApplyTag, done()),
                (Step::WakeAgent, done()),
                (Step::LookupCase, done()),
                (Step::AnnotateCase, done()),
                (Step::AddSystemDetails, StepStatus::Failed("no ePO system".to_string())),
                (Step::ChangeStatus, done()),
            ],
            Outcome::CaseUpdated {
                case_id: "CASE-99".to_string(),
            },
        );
        assert_eq!(
            report_lines(&report),
            [
                "ePO tag: 'Quarantine' applied to system: HOST01",
                "Agent wakeup sent to system: HOST01",
                "LogRhythm case found: CASE-99",
                "Case CASE-99 annotated",
                "add system details failed: no ePO system",
                "Case CASE-99 status changed to Mitigated",
            ]
        );
    }

    #[test]
    fn optional_overrides_parse() {
        let mut args = base_args();
        args.extend_from_slice(&[
            "--wake-agent",
            "--output-root",
            "/srv/srp",
            "--config",
            "/etc/epo-srp.toml",
        ]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.wake_agent);
        assert_eq!(cli.output_root, Some(PathBuf::from("/srv/srp")));
        assert_eq!(cli.config, PathBuf::from("/etc/epo-srp.toml"));
    }

    #[test]
    fn cli_overrides_apply_to_loaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epo-srp.toml");
        std::fs::write(
            &path,
            r#"
                output_root = "/var/lib/srp"
                [epo]
                url = "https://epo.example.com:8443"
                username = "srp"
                [case_api]
                url = "https://pm.example.com:8501/lr-case-api/"
            "#,
        )
        .unwrap();

        let mut args = base_args();
        args.extend_from_slice(&["--wake-agent", "--output-root", "/srv/srp"]);
        let mut cli = Cli::try_parse_from(args).unwrap();
        cli.config = path.clone();
        cli.epo_password = Some("pw".to_string());
        cli.case_token = Some("tok".to_string());

        let config = load_config(&cli).unwrap();
        assert!(config.workflow.wake_agent);
        assert_eq!(config.output_root, PathBuf::from("/srv/srp"));
        assert_eq!(config.epo.password, "pw");
    }
}
