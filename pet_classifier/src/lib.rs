mod routes;

pub mod app;
pub mod config;
pub mod image_file;
pub mod prediction;
pub mod server;
pub mod telemetry;
pub mod upload;
pub mod view;

pub use app::start_app;
