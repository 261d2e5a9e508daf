// BiasLens Core Services

pub mod analysis;
pub mod config_store;
pub mod providers;
pub mod text_processor;

pub use config_store::{AppConfig, ConfigError, ConfigStore, Credentials};
pub use providers::{EmotionClassifier, ProviderError, TextClassifier, TextGenerator};
pub use text_processor::segment_paragraphs;

pub use analysis::{AnalysisError, AnalyzeOptions, ArticleAnalyzer};
