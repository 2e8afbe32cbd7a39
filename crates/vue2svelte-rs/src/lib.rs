//! Converts Vue 2 single-file components to Svelte.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod output;
