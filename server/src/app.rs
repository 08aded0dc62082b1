//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{
    APP_NAME_LOWER, DOWNSTREAM_CONNECT_TIMEOUT_SECS, ENV_LOG, ROOT_SPAN_NAME,
};
use crate::core::shutdown::ShutdownService;
use crate::domain::downstream::HttpDownstream;
use crate::domain::pipeline::{Pipeline, PipelineStats, Stage};
use crate::trace::{LogSink, SpanSink, Tracer};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub tracer: Arc<Tracer>,
    pub pipeline: Arc<Pipeline>,
    pub stats: Arc<PipelineStats>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config)?;
        Self::start_server(app).await
    }

    /// Construct every service explicitly; no process-wide state.
    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let sink: Arc<dyn SpanSink> = Arc::new(LogSink);
        tracing::debug!(backend = sink.name(), "Span sink initialized");
        let tracer = Arc::new(Tracer::new(sink));
        let stats = Arc::new(PipelineStats::new());

        // One shared client for every collaborator; per-stage deadlines are
        // enforced by the orchestrator.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DOWNSTREAM_CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to build downstream HTTP client")?;

        let stages: Vec<Stage> = config
            .pipeline
            .stages
            .iter()
            .map(|stage| {
                tracing::debug!(
                    stage = %stage.name,
                    url = %stage.url,
                    policy = %stage.policy,
                    timeout_ms = stage.timeout_ms,
                    "Stage configured"
                );
                Stage::new(
                    stage.name.clone(),
                    Arc::new(HttpDownstream::new(client.clone(), stage.url.clone())),
                    stage.policy,
                    Duration::from_millis(stage.timeout_ms),
                )
            })
            .collect();

        let pipeline = Arc::new(Pipeline::new(
            tracer.clone(),
            stages,
            stats.clone(),
            ROOT_SPAN_NAME,
        ));
        let shutdown = ShutdownService::new();

        Ok(Self {
            shutdown,
            config,
            tracer,
            pipeline,
            stats,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        banner::print_banner(&app.config);

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
