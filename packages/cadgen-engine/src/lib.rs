pub mod config;
pub mod director;
pub mod error;
pub mod export;
pub mod geometry;
pub mod llm;
pub mod logging;
pub mod spec;
pub mod workers;

mod literal;
