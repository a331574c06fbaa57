use local_visibility_client::http_client::ReqwestVisibilityClient;
use local_visibility_report::{
    DEFAULT_LOG_FILTER, ReportConfig, build_report, log_filter_directive, report_schema,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configure logging from env var `LOCAL_VISIBILITY_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let directive = log_filter_directive(|k| std::env::var(k).ok());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("local_visibility_report: log filter: {}", directive);

    if std::env::args().skip(1).any(|a| a == "--schema") {
        println!("{}", report_schema()?);
        return Ok(());
    }

    let today = chrono::Utc::now().date_naive();
    let config = ReportConfig::from_env(today)?;
    tracing::info!(
        location_id = %config.location_id,
        start = %config.start,
        end = %config.end,
        "local_visibility_report: building report"
    );

    let client = ReqwestVisibilityClient::new(config.client.clone())?;
    let report = build_report(&client, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
