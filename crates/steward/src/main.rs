//! `steward`: command-line front end for the governance decision plane.
//!
//! Every subcommand reads JSON (a file via `--input`, or stdin) and writes a
//! JSON document to stdout. Logs go to stderr.
//!
//! ```bash
//! steward consensus --input batches.json > consensus.json
//! steward triage --input consensus.json
//! steward release advance --release-id rel-… --to candidate
//! RUST_LOG=debug steward audit verify
//! ```

#![allow(clippy::uninlined_format_args)]

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use governance::{AuditQuery, ReleaseStatus};
use tracing::info;

use commands::{CaseMove, Plane};
use config::Settings;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (overrides STEWARD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for records and the audit log (overrides STEWARD_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Actor recorded in audit entries
    #[arg(long, global = true, default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster finding batches into consensus findings
    Consensus {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Turn a consensus result into prioritized proposals
    Triage {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Check whether a proposal would reverse a binding decision
    CheckOscillation {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Confidence behind the proposal
        #[arg(long)]
        confidence: f64,
    },
    /// Gate a reversal of a stored decision
    ShouldFlip {
        #[arg(long)]
        adr_id: String,
        #[arg(long)]
        confidence: f64,
    },
    /// Check whether a proposal resembles a recent decision
    DetectReversion {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Decision stability for a target server
    Stability {
        #[arg(long)]
        server: String,
    },
    /// Record a decision, optionally superseding an existing one
    RecordDecision {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        supersedes: Option<String>,
    },
    /// Store a delivery plan grouping proposals for one target
    Plan {
        #[arg(long)]
        target: String,
        #[arg(long = "proposal", required = true)]
        proposals: Vec<String>,
    },
    /// Release lifecycle
    Release {
        #[command(subcommand)]
        command: ReleaseCommand,
    },
    /// Validate a research case, stored or given as JSON
    ValidateCase {
        #[arg(long, conflicts_with = "input")]
        case_id: Option<String>,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Research case lifecycle
    Case {
        #[command(subcommand)]
        command: CaseCommand,
    },
    /// Audit log inspection
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReleaseCommand {
    Create {
        #[arg(long)]
        plan_id: String,
    },
    Advance {
        #[arg(long)]
        release_id: String,
        /// planning, candidate, staging, canary, released
        #[arg(long)]
        to: ReleaseStatus,
    },
    Rollback {
        #[arg(long)]
        release_id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand, Debug)]
enum CaseCommand {
    /// Store a new case document
    Open {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Replace a case's artifacts without changing its status
    Save {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    Advance {
        #[arg(long)]
        case_id: String,
    },
    /// Send an evaluated case back to implementation
    Reiterate {
        #[arg(long)]
        case_id: String,
    },
    Complete {
        #[arg(long)]
        case_id: String,
    },
    Reject {
        #[arg(long)]
        case_id: String,
        #[arg(long)]
        reason: String,
    },
    Defer {
        #[arg(long)]
        case_id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Recompute every hash link
    Verify,
    Query {
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        target_type: Option<String>,
        #[arg(long)]
        target_id: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
        /// RFC 3339 lower bound
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// RFC 3339 upper bound
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), args.data_dir.clone())?;
    info!(data_dir = %settings.data_dir.display(), "Steward starting");

    let plane = Plane::open(&settings)?;
    let output = run(&plane, args.command, &args.actor)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(plane: &Plane, command: Command, actor: &str) -> Result<serde_json::Value> {
    use commands::read_input;

    match command {
        Command::Consensus { input } => {
            commands::consensus(plane, read_input(input.as_deref())?)
        }
        Command::Triage { input } => commands::triage(plane, read_input(input.as_deref())?),
        Command::CheckOscillation { input, confidence } => {
            commands::check_oscillation(plane, read_input(input.as_deref())?, confidence)
        }
        Command::ShouldFlip { adr_id, confidence } => {
            commands::should_flip(plane, &adr_id, confidence)
        }
        Command::DetectReversion { input } => {
            commands::detect_reversion(plane, read_input(input.as_deref())?)
        }
        Command::Stability { server } => commands::stability(plane, &server),
        Command::RecordDecision { input, supersedes } => commands::record_decision(
            plane,
            read_input(input.as_deref())?,
            supersedes.as_deref(),
            actor,
        ),
        Command::Plan { target, proposals } => commands::create_plan(plane, &target, proposals),
        Command::Release { command } => match command {
            ReleaseCommand::Create { plan_id } => commands::create_release(plane, &plan_id, actor),
            ReleaseCommand::Advance { release_id, to } => {
                commands::advance_release(plane, &release_id, to, actor)
            }
            ReleaseCommand::Rollback { release_id, reason } => {
                commands::rollback_release(plane, &release_id, &reason, actor)
            }
        },
        Command::ValidateCase { case_id, input } => {
            commands::validate(plane, case_id.as_deref(), input.as_deref())
        }
        Command::Case { command } => match command {
            CaseCommand::Open { input } => {
                commands::open_case(plane, read_input(input.as_deref())?, actor)
            }
            CaseCommand::Save { input } => commands::save_case(plane, read_input(input.as_deref())?),
            CaseCommand::Advance { case_id } => {
                commands::move_case(plane, &case_id, CaseMove::Advance, "", actor)
            }
            CaseCommand::Reiterate { case_id } => {
                commands::move_case(plane, &case_id, CaseMove::Reiterate, "", actor)
            }
            CaseCommand::Complete { case_id } => {
                commands::move_case(plane, &case_id, CaseMove::Complete, "", actor)
            }
            CaseCommand::Reject { case_id, reason } => {
                commands::move_case(plane, &case_id, CaseMove::Reject, &reason, actor)
            }
            CaseCommand::Defer { case_id, reason } => {
                commands::move_case(plane, &case_id, CaseMove::Defer, &reason, actor)
            }
        },
        Command::Audit { command } => match command {
            AuditCommand::Verify => commands::audit_verify(plane),
            AuditCommand::Query {
                actor,
                action,
                target_type,
                target_id,
                correlation_id,
                since,
                until,
            } => commands::audit_query(
                plane,
                &AuditQuery {
                    actor,
                    action,
                    target_type,
                    target_id,
                    correlation_id,
                    since,
                    until,
                },
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_advance_parses_status() {
        let args = Args::parse_from([
            "steward",
            "release",
            "advance",
            "--release-id",
            "rel-1",
            "--to",
            "canary",
        ]);
        match args.command {
            Command::Release {
                command: ReleaseCommand::Advance { to, .. },
            } => assert_eq!(to, ReleaseStatus::Canary),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "steward",
            "stability",
            "--server",
            "billing",
            "--data-dir",
            "/tmp/x",
            "--actor",
            "ops",
        ]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(args.actor, "ops");
    }

    #[test]
    fn test_plan_requires_proposals() {
        assert!(Args::try_parse_from(["steward", "plan", "--target", "billing"]).is_err());
    }
}
