//! Training progress reporting.
//!
//! - [`ConsoleLogger`]: periodic one-line summaries through the `log` facade
//! - [`CSVLogger`]: one row per episode for later analysis
//! - [`MultiLogger`]: fan out to several loggers

pub mod logger;

pub use logger::{CSVLogger, ConsoleLogger, EpisodeSnapshot, MetricsLogger, MultiLogger};
