pub mod classifier;
pub mod fetcher;
pub mod reorganize;

// Re-export key types for easier usage
pub use classifier::{ChatClassifier, Classifier, ClassifyError, ClassifyItem, RawClassification};
pub use fetcher::{ContentFetcher, HttpFetcher};
pub use reorganize::{Reorganizer, ReorganizeError, ReorganizeSettings, RunSummary};
