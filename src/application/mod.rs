pub mod use_cases;

pub use use_cases::aggregation::{Aggregation, AggregationEngine};
pub use use_cases::market_analysis::{MarketAnalysisUseCase, PublishedAnalysis};
pub use use_cases::relevant_naics::RelevantNaicsUseCase;
