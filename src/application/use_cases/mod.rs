pub mod aggregation;
pub mod market_analysis;
pub mod relevant_naics;
