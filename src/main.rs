//! Binary entrypoint for the fluorescence analyzer.
//!
//! Decodes one image, measures the selected region, optionally asks the AI
//! backend for an interpretation, and prints the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use fluoro_analyzer::ai::{self, AiError, AnalysisRequest, HttpBackend};
use fluoro_analyzer::config::{self, Configuration};
use fluoro_analyzer::credentials::{
    ChainedCredentials, CredentialProvider, EnvCredentials, SecretsFile,
};
use fluoro_analyzer::report::{AiSection, Report};
use fluoro_analyzer::{ChannelMeans, PixelBuffer, Point, RoiSelection, decode, measure};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "fluoro-analyzer",
    version,
    about = "Extract average RGB values and relative intensity from a fluorescence image"
)]
struct Cli {
    /// JPEG or PNG image to analyze
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Path to YAML config file (defaults apply if it does not exist)
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// ROI center column; measures the whole image when omitted
    #[arg(long, value_name = "X", requires = "center_y")]
    center_x: Option<usize>,

    /// ROI center row
    #[arg(long, value_name = "Y", requires = "center_x")]
    center_y: Option<usize>,

    /// ROI half-size in pixels (overrides roi.radius)
    #[arg(long, value_name = "PX", requires = "center_x")]
    radius: Option<usize>,

    /// Skip the AI interpretation step
    #[arg(long)]
    no_ai: bool,

    /// Send only the RGB values to the AI backend, not the image
    #[arg(long)]
    values_only: bool,

    /// Override the AI request timeout (e.g. "10s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fluoro_analyzer={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!(error = ?err, "fluoro-analyzer exited with error");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = config::from_yaml_file_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let cfg = apply_overrides(cfg, &cli)
        .validated()
        .context("validating configuration")?;

    let buffer = decode::load(cli.image.clone())
        .await
        .with_context(|| format!("decoding {}", cli.image.display()))?;
    info!(
        width = buffer.width(),
        height = buffer.height(),
        "image decoded"
    );

    let selection = match (cli.center_x, cli.center_y) {
        (Some(x), Some(y)) => RoiSelection::Centered {
            center: Point::new(x, y),
            radius: cfg.roi.radius,
        },
        _ => RoiSelection::WholeImage,
    };
    let measurement = measure(&buffer, &selection).context("measuring region of interest")?;
    info!(
        r = measurement.means.r,
        g = measurement.means.g,
        b = measurement.means.b,
        intensity = measurement.intensity,
        "channel means computed"
    );

    let ai = if cfg.ai.enabled {
        run_ai(&cfg, measurement.means, buffer).await
    } else {
        AiSection::Skipped {
            reason: "disabled".to_string(),
        }
    };

    let report = Report {
        source: Some(cli.image.clone()),
        measurement,
        ai,
    };
    if cli.json {
        println!("{}", report.to_json().context("serializing report")?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn apply_overrides(mut cfg: Configuration, cli: &Cli) -> Configuration {
    if let Some(radius) = cli.radius {
        cfg.roi.radius = radius;
    }
    if cli.no_ai {
        cfg.ai.enabled = false;
    }
    if cli.values_only {
        cfg.ai.include_image = false;
    }
    if let Some(timeout) = cli.timeout {
        cfg.ai.timeout = timeout;
    }
    cfg
}

fn credentials(cfg: &Configuration) -> ChainedCredentials {
    let mut chain =
        ChainedCredentials::default().with(EnvCredentials::new(&cfg.ai.api_key_env));
    if let Some(path) = &cfg.ai.secrets_file {
        match SecretsFile::load(path, &cfg.ai.api_key_env) {
            Ok(secrets) => chain = chain.with(secrets),
            Err(err) => warn!(error = ?err, "ignoring unreadable secrets file"),
        }
    }
    chain
}

// Failures here degrade to a report section; the measurement is already final.
async fn run_ai(
    cfg: &Configuration,
    means: ChannelMeans,
    buffer: PixelBuffer,
) -> AiSection {
    let Some(api_key) = credentials(cfg).api_key() else {
        warn!(error = %AiError::MissingCredential, "AI analysis unavailable");
        return AiSection::from_result(Err(AiError::MissingCredential));
    };

    let request = if cfg.ai.include_image {
        let encoded = tokio::task::spawn_blocking(move || {
            AnalysisRequest::with_image(means, &buffer)
        })
        .await;
        match encoded {
            Ok(Ok(request)) => request,
            Ok(Err(err)) => return AiSection::from_result(Err(err)),
            Err(err) => {
                return AiSection::Failed {
                    error: format!("image encoding task failed: {err}"),
                };
            }
        }
    } else {
        AnalysisRequest::values_only(means)
    };

    let backend = match HttpBackend::new(&cfg.ai) {
        Ok(backend) => Arc::new(backend),
        Err(err) => return AiSection::from_result(Err(err)),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    info!(model = %cfg.ai.model, "requesting AI analysis");
    let handle = ai::spawn_analysis(
        backend,
        Some(api_key),
        request,
        cfg.ai.timeout,
        cancel,
    );
    let section = match handle.await {
        Ok(result) => {
            if let Err(err) = &result {
                warn!(error = %err, "AI analysis unavailable");
            }
            AiSection::from_result(result)
        }
        Err(err) => AiSection::Failed {
            error: format!("AI task failed: {err}"),
        },
    };
    ctrl_c.abort();
    section
}
