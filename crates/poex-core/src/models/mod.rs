//! Data models: extraction fragments, finalized documents, configuration.

pub mod adapt;
pub mod config;
pub mod fragment;
pub mod po;
