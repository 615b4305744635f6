#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::uninlined_format_args
)]

pub mod cache;
pub mod config;
pub mod detect;
pub mod observability;
pub mod panel;
pub mod reconcile;
pub mod runner;
pub mod session;

pub use config::Config;
