use clap::Parser;

/// Universal CSP violation report ingest service.
///
/// Accepts every deployed CSP report dialect on POST /csp-report, normalizes
/// the violations, and bulk-indexes them into Elasticsearch. All
/// configuration comes from environment variables.
#[derive(Parser, Debug)]
#[command(name = "csp-ingest", version)]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Args {} = Args::parse();

    let service_config = csp_ingest::ServiceConfig::load()?;
    csp_ingest::start_server(service_config).await
}
