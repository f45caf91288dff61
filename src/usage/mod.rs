//! Local usage pipeline: scan logs, parse, deduplicate, then aggregate daily
//! costs and rate-limit windows.

pub mod aggregator;
pub mod dedup;
pub mod merge;
pub mod parser;
pub mod pricing;
pub mod scanner;
pub mod summary;
pub mod types;
pub mod windows;
