// kvdiag command line.
//
// The root command picks exactly one path: online diagnosis (every check
// against the cluster, report written to the working directory) or offline
// analysis of a stopped member's data directory.

mod args;
mod commands;
pub mod config;
pub mod logging;
pub mod types;

pub use args::Cli;
pub use commands::run;
