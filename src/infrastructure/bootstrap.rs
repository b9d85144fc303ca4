use std::sync::{Arc, Mutex};

use tracing::info;

use crate::application::{AggregationEngine, MarketAnalysisUseCase, RelevantNaicsUseCase};
use crate::domain::error::Result;
use crate::infrastructure::classification::{ClassificationGateway, HttpClassificationGateway};
use crate::infrastructure::config::{AppConfig, ClassifierMode};
use crate::infrastructure::csv::FileDatasetSource;
use crate::infrastructure::llm_clients::OpenAIClient;
use crate::interfaces::http::{HttpState, LogEntry};

/// Wire clients and use cases from configuration.
pub fn build_state(config: &AppConfig) -> Result<HttpState> {
    let groups = config.sector_groups()?;
    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let llm_client = Arc::new(OpenAIClient::with_timeout(config.classifier.timeout())?);
    let relevant_naics = Arc::new(RelevantNaicsUseCase::new(
        llm_client,
        config.llm.clone(),
        groups.clone(),
    ));

    let gateway: Arc<dyn ClassificationGateway + Send + Sync> = match config.classifier.mode {
        ClassifierMode::Direct => relevant_naics.clone(),
        ClassifierMode::Remote => Arc::new(HttpClassificationGateway::new(
            config.classifier.endpoint.clone(),
            config.classifier.timeout(),
            groups.clone(),
        )?),
    };
    info!(
        mode = ?config.classifier.mode,
        dataset = %config.dataset_path,
        "Classification gateway configured"
    );

    let analysis = Arc::new(MarketAnalysisUseCase::new(
        gateway,
        Arc::new(FileDatasetSource::new(&config.dataset_path)),
        AggregationEngine::new(groups),
    ));

    Ok(HttpState {
        relevant_naics,
        analysis,
        logs,
    })
}
