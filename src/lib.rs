// Library crate - exports the analysis pipeline and its collaborators

pub mod analysis_core;
pub mod config;
pub mod data;
pub mod report;
pub mod sentiment;

// Re-export commonly used types
pub use analysis_core::{AnalysisReport, Bar, MarketAnalyzer};
pub use config::AnalyzerConfig;
pub use data::{CsvFileSource, PriceHistorySource, StooqSource};
pub use sentiment::{NewsApiClient, NewsSource, SentimentAnalyzer, SentimentBackend};
