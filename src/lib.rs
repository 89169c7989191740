pub mod activities;
pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod lists;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tracking;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::JsonStore;
pub use sync::SyncController;
