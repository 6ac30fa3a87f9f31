//! Command-line interface for phishnet.
//!
//! Provides commands for annotating an email body with a detection,
//! processing a batch of emails, classifying a confidence score, probing
//! the detection service and showing the resolved configuration.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{DetectionService, FixtureDetectionService, HttpDetectionClient};
use crate::annotate::annotate;
use crate::config::{self, ResolvedConfig};
use crate::core::{Inbox, InboxError};
use crate::domain::{parse_email_batch, Detection, Email, StatusThresholds};

pub mod render;

/// phishnet - Client for the PhishNet phishing detection service
#[derive(Parser, Debug)]
#[command(name = "phishnet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate an email body with a detection payload
    Annotate {
        /// Body file (reads from stdin if not provided)
        #[arg(short, long)]
        body: Option<PathBuf>,

        /// Detection JSON file (body is shown unannotated if not provided)
        #[arg(short, long)]
        detection: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Submit a batch of emails for detection and show the results
    Process {
        /// JSON file with emails (array or {"emails": [...]})
        emails: PathBuf,

        /// Detection API base URL (overrides config)
        #[arg(long)]
        api_base: Option<String>,

        /// Replay detections from a fixture file instead of calling the API
        #[arg(long, conflicts_with = "api_base")]
        fixture: Option<PathBuf>,

        /// Print each email's verdict and annotated body
        #[arg(long)]
        details: bool,
    },

    /// Classify a confidence score with the configured thresholds
    Classify {
        /// Final confidence in [0, 1] (1.0 = not phishing)
        confidence: f64,
    },

    /// Check that the detection service is reachable
    Ping {
        /// Detection API base URL (overrides config)
        #[arg(long)]
        api_base: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Inline markers with numbered notes
    Text,

    /// Segments as JSON
    Json,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Annotate {
                body,
                detection,
                format,
            } => annotate_body(body, detection, format),
            Commands::Process {
                emails,
                api_base,
                fixture,
                details,
            } => process_batch(&emails, api_base, fixture, details).await,
            Commands::Classify { confidence } => classify(confidence),
            Commands::Ping { api_base } => ping(api_base).await,
            Commands::Config => show_config(),
        }
    }
}

/// Read a body from a file, or from stdin when it is piped
fn read_body(body_file: Option<PathBuf>) -> Result<String> {
    if let Some(path) = body_file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read body file: {}", path.display()));
    }

    if io::stdin().is_terminal() {
        anyhow::bail!("No body provided. Use --body <file> or pipe to stdin");
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

/// Load a single detection object; a file containing `null` means no detection
fn load_detection(path: &Path) -> Result<Option<Detection>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read detection file: {}", path.display()))?;

    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse detection file: {}", path.display()))
}

/// Annotate a single body
fn annotate_body(
    body_file: Option<PathBuf>,
    detection_file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let body = read_body(body_file)?;
    let detection = match detection_file {
        Some(path) => load_detection(&path)?,
        None => None,
    };

    let segments = annotate(&body, detection.as_ref());

    match format {
        OutputFormat::Text => println!("{}", render::render_annotated(&body, &segments)),
        OutputFormat::Json => {
            let views = render::segment_views(&body, &segments);
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
    }

    Ok(())
}

/// Pick the detection service for this invocation
fn build_service(
    cfg: &ResolvedConfig,
    api_base: Option<String>,
    fixture: Option<PathBuf>,
) -> Result<Box<dyn DetectionService>> {
    if let Some(path) = fixture {
        let service = FixtureDetectionService::from_file(&path)?;
        return Ok(Box::new(service));
    }

    let client = match api_base {
        Some(base) => HttpDetectionClient::new(base, cfg.api_timeout),
        None => HttpDetectionClient::from_config(cfg),
    };
    Ok(Box::new(client))
}

/// Outcome of submitting one batch
struct BatchReport {
    /// Inbox listing, absent when nothing was recorded
    output: Option<String>,
    /// Submission error, reported after the listing
    failure: Option<InboxError>,
}

/// Submit a batch and render whatever the inbox holds afterwards
///
/// A failed request still renders the listing, so emails kept by
/// `FailurePolicy::KeepUnannotated` are shown unannotated.
async fn submit_and_report(
    inbox: &Inbox,
    service: &dyn DetectionService,
    emails: Vec<Email>,
    details: bool,
) -> BatchReport {
    let failure = inbox.submit(service, emails).await.err();

    let entries = inbox.entries();
    if entries.is_empty() {
        return BatchReport {
            output: None,
            failure,
        };
    }

    let mut output = render::render_inbox_table(&entries, &inbox.counts());
    if details {
        for entry in &entries {
            output.push_str("\n\n");
            output.push_str(&render::render_entry(entry, inbox.thresholds()));
        }
    }

    BatchReport {
        output: Some(output),
        failure,
    }
}

/// Submit a batch and print the inbox
async fn process_batch(
    emails_file: &Path,
    api_base: Option<String>,
    fixture: Option<PathBuf>,
    details: bool,
) -> Result<()> {
    let json = std::fs::read_to_string(emails_file)
        .with_context(|| format!("Failed to read emails file: {}", emails_file.display()))?;
    let emails = parse_email_batch(&json)
        .with_context(|| format!("Failed to parse emails file: {}", emails_file.display()))?;

    let cfg = config::config()?;
    let service = build_service(cfg, api_base, fixture)?;
    let inbox = Inbox::from_config(cfg);

    let report = submit_and_report(&inbox, service.as_ref(), emails, details).await;

    if let Some(err) = &report.failure {
        eprintln!("Warning: detection via '{}' failed: {}", service.name(), err);
    }
    if let Some(output) = &report.output {
        println!("{}", output);
    }

    match report.failure {
        Some(err) => {
            Err(err).with_context(|| format!("Detection via '{}' failed", service.name()))
        }
        None => Ok(()),
    }
}

/// Classify a single score
fn classify(confidence: f64) -> Result<()> {
    let cfg = config::config()?;
    let status = cfg.thresholds.classify(confidence);
    println!("{}", status);
    Ok(())
}

/// Probe the detection service
async fn ping(api_base: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    let client = match api_base {
        Some(base) => HttpDetectionClient::new(base, cfg.api_timeout),
        None => HttpDetectionClient::from_config(cfg),
    };

    client
        .health_check()
        .await
        .with_context(|| format!("Detection service at {} is not healthy", client.base_url()))?;

    println!("Detection service at {} is up", client.base_url());
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;
    let StatusThresholds {
        phishing_max,
        cleared_min,
    } = cfg.thresholds;

    println!("PhishNet Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Detection API:");
    println!("  Base URL: {}", cfg.api_base);
    println!("  Timeout:  {}s", cfg.api_timeout.as_secs());
    println!();
    println!("Status thresholds:");
    println!("  Phishing: confidence <= {}", phishing_max);
    println!("  Flagged:  {} < confidence < {}", phishing_max, cleared_min);
    println!("  Cleared:  confidence >= {}", cleared_min);
    println!();
    println!("Inbox:");
    println!("  On failure: {:?}", cfg.failure_policy);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DetectionError;
    use crate::core::FailurePolicy;
    use async_trait::async_trait;

    /// Service whose every request fails with a gateway error
    struct UnreachableService;

    #[async_trait]
    impl DetectionService for UnreachableService {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn process_emails(
            &self,
            _emails: &[Email],
        ) -> Result<Vec<Option<Detection>>, DetectionError> {
            Err(DetectionError::Status {
                code: 503,
                body: "Service Unavailable".to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), DetectionError> {
            Err(DetectionError::Unhealthy("unreachable".to_string()))
        }
    }

    fn batch() -> Vec<Email> {
        vec![
            Email::new("it@univ-support.co", "Quota exceeded", "Verify your mailbox now."),
            Email::new("registrar@university.edu", "Enrollment", "Opens Monday."),
        ]
    }

    #[tokio::test]
    async fn test_failed_batch_still_lists_kept_emails() {
        let inbox = Inbox::new(StatusThresholds::default(), FailurePolicy::KeepUnannotated);

        let report = submit_and_report(&inbox, &UnreachableService, batch(), true).await;

        assert!(matches!(
            report.failure,
            Some(InboxError::Detection(DetectionError::Status { code: 503, .. }))
        ));
        let output = report.output.unwrap();
        assert!(output.contains("Quota exceeded"));
        assert!(output.contains("Enrollment"));
        assert!(output.contains("2 unscored"));
        assert!(output.contains("Status: no detection available"));
        assert!(output.contains("Verify your mailbox now."));
    }

    #[tokio::test]
    async fn test_failed_batch_dropped_renders_nothing() {
        let inbox = Inbox::new(StatusThresholds::default(), FailurePolicy::Drop);

        let report = submit_and_report(&inbox, &UnreachableService, batch(), false).await;

        assert!(report.failure.is_some());
        assert!(report.output.is_none());
    }

    #[tokio::test]
    async fn test_successful_batch_has_no_failure() {
        let inbox = Inbox::default();
        let service = FixtureDetectionService::new(vec![
            Some(Detection {
                final_confidence: Some(0.2),
                ..Default::default()
            }),
            None,
        ]);

        let report = submit_and_report(&inbox, &service, batch(), false).await;

        assert!(report.failure.is_none());
        assert!(report.output.unwrap().contains("1 phishing"));
    }
}
