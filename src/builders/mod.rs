pub mod config;

pub use config::TrainingConfigBuilder;
