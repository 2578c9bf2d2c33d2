pub mod parse;
pub mod repo;

pub use parse::{parse_change_report, parse_log, LogEntry};
pub use repo::{GitRepo, History};
