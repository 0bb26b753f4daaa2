//! Terminal viewer for a mediadash agent.

pub mod args;
pub mod render;
pub mod types;
pub mod ws;
