// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Themis Control CLI
//!
//! CLI tool for interacting with themis-core.
//!
//! Usage:
//!   themis-ctl <command> [options]
//!
//! Commands:
//!   health                        Check server health
//!   trigger --owner <o> --repo <r> [--branch <b>] [--check-type <t>]
//!   status <check_run_id>
//!   watch <check_run_id>          Poll until the run is terminal
//!   completed [--since-mins <n>]  List recently completed runs
//!   notify [--ledger <path>]      Watch the feed and print notifications
//!   bulk-delete <id> [<id>...]    Delete runs by id

use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use themis_client::notify::{CheckNotification, JsonLedger, NotificationDeduper, Notifier};
use themis_client::{
    CheckType, ClientConfig, PollOutcome, Poller, ThemisClient, TriggerCheckRequest,
};

fn print_usage() {
    eprintln!(
        r#"Usage: themis-ctl <command> [options]

Interact with themis-core.

COMMANDS:
    health                          Check server health
    trigger                         Trigger a compliance check run
    status <check_run_id>           Get one run's status
    watch <check_run_id>            Poll until the run is terminal
    completed                       List recently completed runs
    notify                          Watch the feed and print notifications
    bulk-delete <id> [<id>...]      Delete runs by id

TRIGGER OPTIONS:
    --owner <owner>                 Repository owner (required)
    --repo <repo>                   Repository name (required)
    --branch <branch>               Branch to analyze
    --check-type <type>             APPLE_APP_STORE | GOOGLE_PLAY_STORE |
                                    CHROME_WEB_STORE | MOBILE_PLATFORMS | BOTH

WATCH OPTIONS:
    --interval <secs>               Poll interval (default: 5)

COMPLETED OPTIONS:
    --since-mins <n>                Window in minutes (default: 5)

NOTIFY OPTIONS:
    --ledger <path>                 Ledger file (default: themis-notified.json)

ENVIRONMENT:
    THEMIS_API_KEY                  API key (required)
    THEMIS_APP_URL                  Server base URL (default: http://localhost:3000)

EXAMPLES:
    # Check health
    themis-ctl health

    # Trigger a run and watch it
    themis-ctl trigger --owner acme --repo mobile-app --branch main
    themis-ctl watch <check_run_id>

    # Clean up old runs
    themis-ctl bulk-delete run-1 run-2 run-3
"#
    );
}

#[derive(Debug)]
enum Command {
    Health,
    Trigger {
        owner: String,
        repo: String,
        branch: Option<String>,
        check_type: Option<CheckType>,
    },
    Status {
        check_run_id: String,
    },
    Watch {
        check_run_id: String,
        interval_secs: u64,
    },
    Completed {
        since_mins: i64,
    },
    Notify {
        ledger_path: String,
    },
    BulkDelete {
        check_run_ids: Vec<String>,
    },
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from_vec(&args)
}

fn parse_args_from_vec(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "health" => Ok(Command::Health),
        "trigger" => {
            let mut owner: Option<String> = None;
            let mut repo: Option<String> = None;
            let mut branch: Option<String> = None;
            let mut check_type: Option<CheckType> = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--owner" => {
                        i += 1;
                        owner = Some(args.get(i).ok_or("--owner requires a value")?.clone());
                    }
                    "--repo" => {
                        i += 1;
                        repo = Some(args.get(i).ok_or("--repo requires a value")?.clone());
                    }
                    "--branch" => {
                        i += 1;
                        branch = Some(args.get(i).ok_or("--branch requires a value")?.clone());
                    }
                    "--check-type" => {
                        i += 1;
                        let raw = args.get(i).ok_or("--check-type requires a value")?;
                        check_type = Some(
                            CheckType::parse(raw)
                                .ok_or(format!("Unknown check type: {}", raw))?,
                        );
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Trigger {
                owner: owner.ok_or("--owner is required")?,
                repo: repo.ok_or("--repo is required")?,
                branch,
                check_type,
            })
        }
        "status" => {
            let check_run_id = args.get(2).ok_or("status requires a check_run_id")?.clone();
            Ok(Command::Status { check_run_id })
        }
        "watch" => {
            let check_run_id = args.get(2).ok_or("watch requires a check_run_id")?.clone();
            let mut interval_secs: u64 = 5;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--interval" => {
                        i += 1;
                        interval_secs = args
                            .get(i)
                            .ok_or("--interval requires seconds")?
                            .parse()
                            .map_err(|_| "Invalid interval")?;
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Watch {
                check_run_id,
                interval_secs,
            })
        }
        "completed" => {
            let mut since_mins: i64 = 5;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--since-mins" => {
                        i += 1;
                        since_mins = args
                            .get(i)
                            .ok_or("--since-mins requires a number")?
                            .parse()
                            .map_err(|_| "Invalid --since-mins")?;
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Completed { since_mins })
        }
        "notify" => {
            let mut ledger_path = "themis-notified.json".to_string();

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--ledger" => {
                        i += 1;
                        ledger_path = args.get(i).ok_or("--ledger requires a path")?.clone();
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Notify { ledger_path })
        }
        "bulk-delete" => {
            let check_run_ids: Vec<String> = args[2..].to_vec();
            if check_run_ids.is_empty() {
                return Err("bulk-delete requires at least one id".to_string());
            }
            Ok(Command::BulkDelete { check_run_ids })
        }
        cmd => Err(format!("Unknown command: {}", cmd)),
    }
}

/// Prints each notification as one line on stdout.
struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, notification: &CheckNotification) -> themis_client::Result<()> {
        println!(
            "{} check completed for {}  {}",
            notification.store_name, notification.repository, notification.link
        );
        Ok(())
    }
}

async fn execute_command(
    client: &ThemisClient,
    app_url: &str,
    cmd: Command,
) -> Result<(), String> {
    match cmd {
        Command::Health => {
            let health = client.health().await.map_err(|e| e.to_string())?;
            println!(
                "healthy: {}  version: {}  uptime_ms: {}  active_checks: {}",
                health.healthy, health.version, health.uptime_ms, health.active_checks
            );
            Ok(())
        }
        Command::Trigger {
            owner,
            repo,
            branch,
            check_type,
        } => {
            let triggered = client
                .trigger_check(&TriggerCheckRequest {
                    owner,
                    repo,
                    branch_name: branch,
                    repository_id: None,
                    check_type,
                })
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", triggered.check_run_id);
            Ok(())
        }
        Command::Status { check_run_id } => {
            let run = client
                .get_check(&check_run_id)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}  {:?}  {}/{}  created: {}",
                run.check_run_id, run.status, run.owner, run.repo, run.created_at
            );
            if let Some(summary) = run.summary {
                println!(
                    "issues: {} total / {} high / {} medium / {} low",
                    summary.total_issues,
                    summary.high_severity,
                    summary.medium_severity,
                    summary.low_severity
                );
            }
            if let Some(message) = run.error_message {
                println!("error: {}", message);
            }
            Ok(())
        }
        Command::Watch {
            check_run_id,
            interval_secs,
        } => {
            let outcome = Poller::new(client.clone())
                .with_interval(Duration::from_secs(interval_secs))
                .poll(&check_run_id)
                .await
                .map_err(|e| e.to_string())?;
            match outcome {
                PollOutcome::Passed { summary } => {
                    println!("passed ({} advisory issues)", summary.total_issues);
                    Ok(())
                }
                PollOutcome::IssuesFound { summary } => Err(format!(
                    "{} high-severity issues found ({} total)",
                    summary.high_severity, summary.total_issues
                )),
                PollOutcome::CheckFailed { message } => Err(format!("check failed: {}", message)),
            }
        }
        Command::Completed { since_mins } => {
            let since = Utc::now() - chrono::Duration::minutes(since_mins);
            let completed = client
                .list_completed_since(since)
                .await
                .map_err(|e| e.to_string())?;
            for run in completed {
                println!(
                    "{}  {}/{}  {}  issues: {}",
                    run.check_run_id, run.owner, run.repo, run.completed_at, run.issue_count
                );
            }
            Ok(())
        }
        Command::Notify { ledger_path } => {
            let mut deduper = NotificationDeduper::load(
                client.clone(),
                app_url,
                JsonLedger::new(&ledger_path),
                StdoutNotifier,
                Utc::now(),
            )
            .map_err(|e| e.to_string())?;
            println!("Watching completed feed (ledger: {})...", ledger_path);
            deduper.run().await;
            Ok(())
        }
        Command::BulkDelete { check_run_ids } => {
            let deleted = client
                .bulk_delete(check_run_ids)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", deleted.message);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("themis_client=warn".parse().unwrap()),
        )
        .init();

    let cmd = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    // Create client from environment
    let config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app_url = config.app_url.clone();
    let client = match ThemisClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match execute_command(&client, &app_url, cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        std::iter::once("themis-ctl")
            .chain(parts.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_trigger() {
        let cmd = parse_args_from_vec(&args(&[
            "trigger",
            "--owner",
            "acme",
            "--repo",
            "app",
            "--check-type",
            "BOTH",
        ]))
        .unwrap();
        match cmd {
            Command::Trigger {
                owner,
                repo,
                branch,
                check_type,
            } => {
                assert_eq!(owner, "acme");
                assert_eq!(repo, "app");
                assert!(branch.is_none());
                assert_eq!(check_type, Some(CheckType::Both));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trigger_requires_owner_and_repo() {
        assert!(parse_args_from_vec(&args(&["trigger", "--owner", "acme"])).is_err());
        assert!(parse_args_from_vec(&args(&["trigger", "--repo", "app"])).is_err());
    }

    #[test]
    fn test_parse_bulk_delete_requires_ids() {
        assert!(parse_args_from_vec(&args(&["bulk-delete"])).is_err());
        let cmd = parse_args_from_vec(&args(&["bulk-delete", "a", "b"])).unwrap();
        match cmd {
            Command::BulkDelete { check_run_ids } => assert_eq!(check_run_ids, vec!["a", "b"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_args_from_vec(&args(&["frobnicate"])).is_err());
    }
}
