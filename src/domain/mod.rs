pub mod error;
pub mod llm_config;

// NAICS firm-count analysis
pub mod naics;
