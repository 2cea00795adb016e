use anyhow::Result;
use ncabsentee::{
    config::PipelineConfig,
    pipeline::{self, RunOutcome},
};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure ────────────────────────────────────────────────
    let config = PipelineConfig::from_env()?;
    info!(
        url = %config.source_url,
        download_dir = %config.download_dir.display(),
        output = %config.output_path.display(),
        "configured"
    );

    // ─── 3) fetch → extract → parse → aggregate ─────────────────────
    let client = Client::new();
    match pipeline::run(&client, &config).await? {
        RunOutcome::Written(report) => info!(
            rows = report.rows,
            accepted = report.accepted,
            groups = report.groups,
            "all done"
        ),
        RunOutcome::NoRecords { csv } => warn!(csv = %csv.display(), "no records; no output written"),
        RunOutcome::ParseFailed { csv, reason } => {
            warn!(csv = %csv.display(), %reason, "parse failed; no output written")
        }
    }

    Ok(())
}
