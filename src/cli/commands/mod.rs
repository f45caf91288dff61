pub mod config;
pub mod serve;
pub mod summary;
pub mod watch;
