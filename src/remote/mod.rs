//! Authoritative rate-limit utilization from the OAuth usage endpoint
//!
//! - Bearer token retrieval from Keychain/file
//! - Utilization for the 5-hour and 7-day windows

pub mod api;
pub mod credentials;
pub mod types;
