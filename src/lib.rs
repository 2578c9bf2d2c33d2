pub mod aggregate;
pub mod artifact;
pub mod cli;
pub mod clone;
pub mod config;
pub mod error;
pub mod git;
pub mod insights;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod server;
pub mod stats;
pub mod store;
pub mod summary;
pub mod util;
