mod aws;

pub mod annotator;
pub mod app;
pub mod config;
pub mod detection;
pub mod inference;
pub mod object_store;
pub mod report;

pub use app::start_app;
