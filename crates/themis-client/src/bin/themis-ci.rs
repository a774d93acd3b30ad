// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Themis CI Gate
//!
//! Triggers a compliance check for the current repository and polls it to
//! completion. Exit code 0 means the check passed; 1 means anything else
//! (missing configuration, trigger error, polling timeout, failed run, or
//! high-severity findings).
//!
//! Environment:
//!   THEMIS_API_KEY      API key for themis-core (required)
//!   THEMIS_APP_URL      Server base URL (default: http://localhost:3000)
//!   GITHUB_REPOSITORY   Target as "owner/repo" (required)
//!   GITHUB_REF_NAME     Branch to analyze (default: "main")
//!   THEMIS_CHECK_TYPE   Check type (default: MOBILE_PLATFORMS)

use std::process::ExitCode;

use themis_client::{
    CheckType, ClientError, PollOutcome, Poller, ThemisClient, TriggerCheckRequest,
};

struct CiTarget {
    owner: String,
    repo: String,
    branch: String,
    check_type: CheckType,
}

fn target_from_env() -> Result<CiTarget, String> {
    let repository = std::env::var("GITHUB_REPOSITORY")
        .map_err(|_| "GITHUB_REPOSITORY is not set".to_string())?;
    let (owner, repo) = repository
        .split_once('/')
        .ok_or_else(|| format!("GITHUB_REPOSITORY must be owner/repo, got '{}'", repository))?;
    if owner.is_empty() || repo.is_empty() {
        return Err(format!(
            "GITHUB_REPOSITORY must be owner/repo, got '{}'",
            repository
        ));
    }

    let branch = std::env::var("GITHUB_REF_NAME").unwrap_or_else(|_| "main".to_string());

    let check_type = match std::env::var("THEMIS_CHECK_TYPE") {
        Err(_) => CheckType::MobilePlatforms,
        Ok(raw) => CheckType::parse(&raw)
            .ok_or_else(|| format!("THEMIS_CHECK_TYPE has unknown value '{}'", raw))?,
    };

    Ok(CiTarget {
        owner: owner.to_string(),
        repo: repo.to_string(),
        branch,
        check_type,
    })
}

async fn run() -> Result<PollOutcome, String> {
    let target = target_from_env()?;

    let client = ThemisClient::from_env().map_err(|e| e.to_string())?;

    println!(
        "Triggering {} compliance check for {}/{} ({})",
        target.check_type.display_name(),
        target.owner,
        target.repo,
        target.branch
    );

    let triggered = client
        .trigger_check(&TriggerCheckRequest {
            owner: target.owner,
            repo: target.repo,
            branch_name: Some(target.branch),
            repository_id: None,
            check_type: Some(target.check_type),
        })
        .await
        .map_err(|e| format!("Failed to trigger check: {}", e))?;

    println!("Check run {} created, polling...", triggered.check_run_id);

    Poller::new(client)
        .poll(&triggered.check_run_id)
        .await
        .map_err(|e| match e {
            ClientError::Timeout(attempts) => {
                format!("Check did not finish within {} poll attempts", attempts)
            }
            other => format!("Polling failed: {}", other),
        })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("themis_client=warn".parse().unwrap()),
        )
        .init();

    match run().await {
        Ok(PollOutcome::Passed { summary }) => {
            println!(
                "Compliance check passed ({} advisory issues)",
                summary.total_issues
            );
            ExitCode::SUCCESS
        }
        Ok(PollOutcome::IssuesFound { summary }) => {
            eprintln!(
                "Compliance check found {} high-severity issues ({} total)",
                summary.high_severity, summary.total_issues
            );
            ExitCode::FAILURE
        }
        Ok(PollOutcome::CheckFailed { message }) => {
            eprintln!("Compliance check failed: {}", message);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
