pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pairing;
pub mod realtime;
pub mod response;
pub mod util;

pub use api::serve::{build_router, serve};
pub use config::AppConfig;
pub use util::app_state::AppState;
