//! Event History Adapters
//!
//! Log-based history reconstruction: the adaptive block-range paginator
//! both oracle adapters use to rebuild proposal, answer, and execution
//! history without knowing the provider's query window cap.

pub mod range;

pub use range::RangeFetcher;
