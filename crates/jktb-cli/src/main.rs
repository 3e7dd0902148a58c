//! jktb command line entry point.
//!
//! Thin shell around [`jktb_flow::ReportWorkflow`]: parses arguments, sets up
//! logging, loads configuration and prints one status line per stage.

use anyhow::Context;
use clap::{Parser, Subcommand};
use jktb_core::{AppConfig, ReportError, SubmissionTemplate};
use jktb_flow::{CaptchaClassifier, CommandClassifier, PromptClassifier, ReportWorkflow};
use jktb_http::Session;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "jktb", version, about = "Automated HITwh daily health report")]
struct Cli {
    /// Configuration file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// External OCR program; receives the CAPTCHA image on stdin
    #[arg(long, global = true, value_name = "PROGRAM")]
    ocr_command: Option<String>,

    /// Argument passed to the OCR program (repeatable)
    #[arg(
        long = "ocr-arg",
        global = true,
        value_name = "ARG",
        allow_hyphen_values = true,
        requires = "ocr_command"
    )]
    ocr_args: Vec<String>,

    /// Where to save the CAPTCHA image when solving it by hand
    #[arg(long, global = true, value_name = "PATH")]
    captcha_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Log in, verify today's form and submit it
    Run,
    /// Log in and verify today's form without submitting
    Check,
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "info,jktb=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_classifier(cli: &Cli) -> anyhow::Result<Box<dyn CaptchaClassifier>> {
    if let Some(program) = &cli.ocr_command {
        anyhow::ensure!(!program.trim().is_empty(), "--ocr-command must not be empty");
        return Ok(Box::new(CommandClassifier::new(
            program.as_str(),
            cli.ocr_args.clone(),
        )));
    }

    let path = cli
        .captcha_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("jktb-captcha.png"));
    Ok(Box::new(PromptClassifier::new(path)))
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    // Load the template up front so a broken file fails before logging in.
    let template = match cli.command {
        Command::Run => Some(
            SubmissionTemplate::load(&config.submission.template_path)
                .context("failed to load submission template")?,
        ),
        Command::Check => None,
    };

    let session = Session::from_config(&config).context("failed to create HTTP session")?;
    let workflow = ReportWorkflow::new(&config, session, build_classifier(cli)?)
        .with_progress(|stage| println!("{}", stage.done_message()));

    let verification = match &template {
        Some(template) => workflow.run(template).await?,
        None => workflow.check().await?,
    };
    info!(
        name = %verification.identity.name,
        form_id = %verification.today_form_id,
        "run finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    println!("==========================");
    println!("#   HITwh 每日健康填报     #");
    println!("==========================");

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ReportError>() {
            Some(report) => {
                println!("{report}");
                if report.is_failure() {
                    tracing::debug!(kind = %report.kind(), "run failed: {err:?}");
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}
