pub mod api;
pub mod app;
pub mod clicks;
pub mod clock;
pub mod codegen;
pub mod config;
pub mod events;
pub mod middleware;
pub mod models;
pub mod redirect;
pub mod registry;
pub mod storage;

pub use app::create_app;
