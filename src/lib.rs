pub mod backend;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod engine_async;
pub mod expect;
pub mod i18n;
pub mod naming;
pub mod render;
pub mod report;
pub mod types;

// Re-export the localization macros
pub use crate::i18n::{t, t_with_args};
