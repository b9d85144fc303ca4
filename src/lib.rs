mod application;
mod domain;
mod infrastructure;
mod interfaces;

pub use crate::application::{
    Aggregation, AggregationEngine, MarketAnalysisUseCase, PublishedAnalysis,
    RelevantNaicsUseCase,
};
pub use crate::domain::error::{AppError, Result};
pub use crate::domain::llm_config::{LLMConfig, LLMProvider};
pub use crate::domain::naics::{
    extract_grouping_code, parse_firm_count, parse_firm_size, AggregateResult, AnalysisOutcome,
    AnalysisQuery, DataQualityReport, DatasetRow, DatasetTable, RelevantSectorSet, SectorGroups,
};
pub use crate::infrastructure::classification::{ClassificationGateway, HttpClassificationGateway};
pub use crate::infrastructure::config::{AppConfig, ClassifierMode};
pub use crate::infrastructure::csv::{
    export_annotated, export_summary, parse_summary, DatasetReader, DatasetSource,
    FileDatasetSource,
};
pub use crate::infrastructure::llm_clients::{LLMClient, OpenAIClient};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load configuration, install logging, and serve the HTTP API until shutdown.
pub async fn run() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load().map_err(std::io::Error::other)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let state = infrastructure::bootstrap::build_state(&config).map_err(std::io::Error::other)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting NAICS TAM server"
    );
    interfaces::http::start_server(state, &config.server.host, config.server.port)?.await
}
