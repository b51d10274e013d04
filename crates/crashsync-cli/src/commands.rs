//! CLI command implementations

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use crashsync_core::{
    BigQueryIssueSource, Collaborators, CrashlyticsAnalysisConfig, Decision, RunOptions,
    RunSummary, SlackWebhook, TargetDay, WrikeClient,
};
use std::path::PathBuf;
use tabled::{Table, Tabled};

/// Environment fallback for the config path
const CONFIG_ENV: &str = "CRASHSYNC_CONFIG";

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Issue")]
    issue: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    flag.or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
    .or_else(CrashlyticsAnalysisConfig::default_path)
    .ok_or_else(|| anyhow!("No config path given. Use --config or set {}", CONFIG_ENV))
}

fn load_config(flag: Option<PathBuf>) -> Result<CrashlyticsAnalysisConfig> {
    let path = resolve_config_path(flag)?;
    let config = CrashlyticsAnalysisConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub async fn run(
    config: Option<PathBuf>,
    target_date: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let crashlytics = &config.crashlytics_config;
    let day = TargetDay::resolve(
        target_date.as_deref(),
        &crashlytics.timezone,
        crashlytics.days_back,
        chrono::Utc::now(),
    )?;

    let source = BigQueryIssueSource::new(crashlytics).context("Failed to build BigQuery client")?;
    let tracker = WrikeClient::new(&config.wrike_config).context("Failed to build Wrike client")?;
    let chat = SlackWebhook::new(&config.slack_notify_config)
        .context("Failed to build Slack client")?;

    let summary = crashsync_core::run(
        &config,
        Collaborators {
            source: &source,
            tracker: &tracker,
            chat: &chat,
        },
        day,
        RunOptions { dry_run },
    )
    .await
    .with_context(|| format!("Run for {day} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, dry_run);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!(
        "{} {} crash issues for {} ({} unique)",
        "✓".green(),
        summary.issues.len(),
        summary.target_day.cyan(),
        summary.unique_issues
    );

    if dry_run {
        if summary.plan.is_empty() {
            println!("Nothing to do");
            return;
        }
        let rows: Vec<PlanRow> = summary
            .plan
            .iter()
            .map(|action| {
                let (label, detail) = match &action.decision {
                    Decision::Create { task } => ("create".green(), task.title.clone()),
                    Decision::Reactivate { task_id, status_id } => (
                        "reactivate".yellow(),
                        format!("{task_id} -> {status_id}"),
                    ),
                    Decision::Skip { task_id, reason } => {
                        ("skip".dimmed(), format!("{task_id} ({reason})"))
                    }
                };
                PlanRow {
                    issue: action.issue_id.clone(),
                    action: label.to_string(),
                    detail,
                }
            })
            .collect();
        println!("{}", Table::new(rows));
        println!("{}", "Dry run: no tasks written, Slack not notified".dimmed());
        return;
    }

    if let Some(report) = summary.report {
        println!("  Created:     {}", report.created);
        println!("  Reactivated: {}", report.reactivated);
        println!(
            "  Skipped:     {} ({} open, {} fixed/ignored)",
            report.skipped(),
            report.skipped_open,
            report.skipped_fixed
        );
    }
    if summary.notified {
        println!("  Slack:       notified");
    }
}

pub fn config_show(config: Option<PathBuf>, json: bool) -> Result<()> {
    let path = resolve_config_path(config)?;
    let config = CrashlyticsAnalysisConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?
        .redacted();

    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        println!("{} {}", "Config:".bold(), path.display());
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

pub fn config_example() -> Result<()> {
    print!("{}", CrashlyticsAnalysisConfig::example());
    Ok(())
}

pub fn config_path() -> Result<()> {
    let path = CrashlyticsAnalysisConfig::default_path()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

/// Report a failed command to the terminal and to GitHub Actions
pub fn report_failure(err: &anyhow::Error) {
    println!("::error::{}", escape_workflow_message(&format!("{err:#}")));
    eprintln!("{} {}", "error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".red(), cause);
    }
}

/// Escape a message for a workflow command line
fn escape_workflow_message(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
