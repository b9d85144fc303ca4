//! Market analysis orchestration
//!
//! One run is a strictly sequential pipeline:
//! - validate the query (no network call for an empty description)
//! - classify the description into relevant sectors
//! - load the dataset and aggregate
//! - publish the outcome if no newer run has started meanwhile
//!
//! Starting a run cancels the classification of any run still in flight.
//! Each run owns its sector set, rows and results; only the published
//! outcome is shared.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::aggregation::AggregationEngine;
use crate::domain::error::{AppError, Result};
use crate::domain::naics::{AnalysisOutcome, AnalysisQuery, DatasetTable};
use crate::infrastructure::classification::ClassificationGateway;
use crate::infrastructure::csv::{export_annotated, export_summary, DatasetSource};

/// Last successful run with the dataset it was computed from.
#[derive(Debug, Clone)]
pub struct PublishedAnalysis {
    pub outcome: AnalysisOutcome,
    pub dataset: Arc<DatasetTable>,
}

struct InFlight {
    run_id: u64,
    cancel: CancellationToken,
}

pub struct MarketAnalysisUseCase {
    gateway: Arc<dyn ClassificationGateway + Send + Sync>,
    dataset: Arc<dyn DatasetSource + Send + Sync>,
    engine: AggregationEngine,
    latest_run: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    published: Mutex<Option<Arc<PublishedAnalysis>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MarketAnalysisUseCase {
    pub fn new(
        gateway: Arc<dyn ClassificationGateway + Send + Sync>,
        dataset: Arc<dyn DatasetSource + Send + Sync>,
        engine: AggregationEngine,
    ) -> Self {
        Self {
            gateway,
            dataset,
            engine,
            latest_run: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            published: Mutex::new(None),
        }
    }

    /// Id of the most recently started run; 0 before the first run.
    pub fn latest_run_id(&self) -> u64 {
        self.latest_run.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Option<Arc<PublishedAnalysis>> {
        lock(&self.published).clone()
    }

    pub async fn run(&self, query: AnalysisQuery) -> Result<AnalysisOutcome> {
        query.ensure_valid()?;

        let (run_id, cancel) = self.begin_run();
        info!(
            run_id,
            size_threshold = query.size_threshold,
            "Starting market analysis"
        );

        let result = self.execute(run_id, &cancel, query).await;
        self.end_run(run_id);

        if let Err(err) = &result {
            warn!(run_id, error = %err, "Market analysis failed");
        }
        result
    }

    async fn execute(
        &self,
        run_id: u64,
        cancel: &CancellationToken,
        query: AnalysisQuery,
    ) -> Result<AnalysisOutcome> {
        let relevant = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled(run_id)),
            relevant = self.gateway.classify(&query) => relevant?,
        };
        info!(run_id, codes = ?relevant, "Relevant sectors resolved");
        self.ensure_current(run_id)?;

        let dataset = Arc::new(self.dataset.load().await?);
        let aggregation =
            self.engine
                .aggregate(dataset.rows(), &relevant, query.size_threshold);

        let outcome = AnalysisOutcome {
            run_id,
            query,
            relevant_codes: relevant,
            results: aggregation.results,
            warnings: aggregation.warnings,
            completed_at: Utc::now(),
        };

        self.publish(outcome.clone(), dataset)?;
        info!(
            run_id,
            sectors = outcome.results.len(),
            total_firms = outcome.total_addressable_firms(),
            "Market analysis complete"
        );
        Ok(outcome)
    }

    /// The id is allocated under the slot lock so ids and slot writes share one order.
    fn begin_run(&self) -> (u64, CancellationToken) {
        let cancel = CancellationToken::new();

        let (run_id, previous) = {
            let mut in_flight = lock(&self.in_flight);
            let run_id = self.latest_run.fetch_add(1, Ordering::SeqCst) + 1;
            let previous = in_flight.replace(InFlight {
                run_id,
                cancel: cancel.clone(),
            });
            (run_id, previous)
        };
        if let Some(previous) = previous {
            info!(run_id = previous.run_id, superseded_by = run_id, "Cancelling stale run");
            previous.cancel.cancel();
        }
        (run_id, cancel)
    }

    fn end_run(&self, run_id: u64) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.as_ref().map(|f| f.run_id) == Some(run_id) {
            *in_flight = None;
        }
    }

    fn ensure_current(&self, run_id: u64) -> Result<()> {
        if self.latest_run_id() == run_id {
            Ok(())
        } else {
            Err(AppError::Cancelled(run_id))
        }
    }

    fn publish(&self, outcome: AnalysisOutcome, dataset: Arc<DatasetTable>) -> Result<()> {
        let mut published = lock(&self.published);
        self.ensure_current(outcome.run_id)?;
        *published = Some(Arc::new(PublishedAnalysis { outcome, dataset }));
        Ok(())
    }

    pub fn export_summary(&self) -> Result<String> {
        let published = self.published().ok_or(AppError::NoAnalysis)?;
        export_summary(&published.outcome.results)
    }

    pub fn export_annotated(&self) -> Result<String> {
        let published = self.published().ok_or(AppError::NoAnalysis)?;
        export_annotated(&published.dataset, &published.outcome.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::naics::{
        AggregateResult, DatasetRow, RelevantSectorSet, SectorGroups,
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// "slow ..." descriptions never resolve; "fail ..." ones error.
    struct StubGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClassificationGateway for StubGateway {
        async fn classify(&self, query: &AnalysisQuery) -> Result<RelevantSectorSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.description.starts_with("slow") {
                std::future::pending::<()>().await;
            }
            if query.description.starts_with("fail") {
                return Err(AppError::Classification("upstream 500".to_string()));
            }
            Ok(RelevantSectorSet::from_codes(["54", "XX", "6"], &SectorGroups::naics()))
        }
    }

    struct StubDataset {
        fail: bool,
    }

    #[async_trait]
    impl DatasetSource for StubDataset {
        async fn load(&self) -> Result<DatasetTable> {
            if self.fail {
                return Err(AppError::DatasetLoad("missing file".to_string()));
            }
            Ok(DatasetTable::from_rows(vec![
                DatasetRow::new("54", "Professional Services", "20-99", "100"),
                DatasetRow::new("5415", "Computer Systems", "100-499", "50"),
                DatasetRow::new("62", "Health Care", "1-4", "70"),
            ]))
        }
    }

    fn use_case(fail_dataset: bool) -> (Arc<MarketAnalysisUseCase>, Arc<StubGateway>) {
        let gateway = Arc::new(StubGateway {
            calls: AtomicUsize::new(0),
        });
        let use_case = MarketAnalysisUseCase::new(
            gateway.clone(),
            Arc::new(StubDataset { fail: fail_dataset }),
            AggregationEngine::default(),
        );
        (Arc::new(use_case), gateway)
    }

    fn query(description: &str, threshold: u64) -> AnalysisQuery {
        AnalysisQuery {
            description: description.to_string(),
            size_threshold: threshold,
        }
    }

    #[tokio::test]
    async fn test_run_publishes_outcome() {
        let (use_case, _) = use_case(false);
        let outcome = use_case.run(query("IT consulting", 0)).await.unwrap();

        assert_eq!(outcome.run_id, 1);
        assert_eq!(outcome.relevant_codes.iter().collect::<Vec<_>>(), vec!["54"]);
        assert_eq!(
            outcome.results,
            vec![AggregateResult {
                sector_key: "54".to_string(),
                description: "Professional Services".to_string(),
                total_firms: 150,
            }]
        );
        assert_eq!(use_case.published().unwrap().outcome, outcome);
    }

    #[tokio::test]
    async fn test_empty_description_never_reaches_gateway() {
        let (use_case, gateway) = use_case(false);
        let err = use_case.run(query("", 0)).await.unwrap_err();

        assert!(matches!(err, AppError::InputValidation(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert_eq!(use_case.latest_run_id(), 0);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_result() {
        let (use_case, _) = use_case(false);
        let first = use_case.run(query("IT consulting", 0)).await.unwrap();

        let err = use_case.run(query("fail please", 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Classification(_)));
        assert_eq!(use_case.published().unwrap().outcome, first);
    }

    #[tokio::test]
    async fn test_dataset_failure_aborts_run() {
        let (use_case, _) = use_case(true);
        let err = use_case.run(query("IT consulting", 0)).await.unwrap_err();

        assert!(matches!(err, AppError::DatasetLoad(_)));
        assert!(use_case.published().is_none());
    }

    #[tokio::test]
    async fn test_newer_run_cancels_stale_one() {
        let (use_case, _) = use_case(false);

        let stale = {
            let use_case = use_case.clone();
            tokio::spawn(async move { use_case.run(query("slow request", 0)).await })
        };
        while use_case.latest_run_id() == 0 {
            tokio::task::yield_now().await;
        }

        let fresh = use_case.run(query("IT consulting", 100)).await.unwrap();
        assert_eq!(fresh.run_id, 2);

        let stale = stale.await.unwrap();
        assert_eq!(stale.unwrap_err(), AppError::Cancelled(1));
        assert_eq!(use_case.published().unwrap().outcome.run_id, 2);
    }

    #[test]
    fn test_concurrent_starts_never_cancel_the_newest_run() {
        use std::sync::Barrier;

        const THREADS: usize = 8;

        for _ in 0..200 {
            let (use_case, _) = use_case(false);
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let use_case = use_case.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        use_case.begin_run()
                    })
                })
                .collect();

            let mut runs: Vec<(u64, CancellationToken)> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();
            runs.sort_by_key(|(run_id, _)| *run_id);

            let (newest_id, newest) = runs.pop().unwrap();
            assert_eq!(newest_id, THREADS as u64);
            assert!(!newest.is_cancelled());
            assert!(runs.iter().all(|(_, cancel)| cancel.is_cancelled()));
        }
    }

    #[tokio::test]
    async fn test_exports_require_an_analysis() {
        let (use_case, _) = use_case(false);
        assert_eq!(use_case.export_summary().unwrap_err(), AppError::NoAnalysis);
        assert_eq!(use_case.export_annotated().unwrap_err(), AppError::NoAnalysis);

        use_case.run(query("IT consulting", 0)).await.unwrap();

        let summary = use_case.export_summary().unwrap();
        assert_eq!(summary.lines().nth(1), Some("54,Professional Services,150"));

        let annotated = use_case.export_annotated().unwrap();
        let flags: Vec<&str> = annotated
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap_or_default())
            .collect();
        assert_eq!(flags, vec!["yes", "yes", "no"]);
    }
}
