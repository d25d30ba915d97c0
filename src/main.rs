use axum::routing::get;
use axum::Json;
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use talent_ai::config::AppConfig;
use talent_ai::error::AppError;
use talent_ai::telemetry;
use talent_ai::workflows::campaign::demo::{
    HeuristicEvaluator, ProfilePoolSourcer, TemplateDrafter,
};
use talent_ai::workflows::campaign::{campaign_router, CampaignStore, PipelineOrchestrator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Agentic Recruiting Orchestrator",
    about = "Run the recruiting campaign orchestrator from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one full campaign against the built-in demo collaborators and
    /// print the resulting state and audit trail
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// Job description used for the demo campaign
    #[arg(
        long,
        default_value = "Senior Backend Engineer building resilient recruitment automation"
    )]
    job_description: String,
}

fn build_orchestrator(
    config: &AppConfig,
) -> Arc<PipelineOrchestrator<ProfilePoolSourcer, HeuristicEvaluator, TemplateDrafter>> {
    let store = Arc::new(CampaignStore::in_memory());
    Arc::new(PipelineOrchestrator::new(
        store,
        Arc::new(ProfilePoolSourcer::default()),
        Arc::new(HeuristicEvaluator::default()),
        Arc::new(TemplateDrafter::default()),
        config.pipeline.pipeline_config(),
    ))
}

async fn serve(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle): (_, PrometheusHandle) =
        PrometheusMetricLayer::pair();
    let orchestrator = build_orchestrator(&config);

    let app = campaign_router(orchestrator)
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route(
            "/metrics",
            get(move || {
                let handle = prometheus_handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?config.environment, %addr, "recruiting campaign orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let orchestrator = build_orchestrator(&config);
    let store = orchestrator.store().clone();

    let campaign_id = store.create(&args.job_description)?;
    let record = orchestrator.run_to_review(&campaign_id).await?;

    let report = json!({
        "campaign": record.view(),
        "audit": store.audit_entries(&campaign_id),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string())
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
        Command::Demo(args) => demo(args).await,
    }
}
