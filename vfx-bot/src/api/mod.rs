//! HTTP status page for the bot

pub mod health;
pub mod status;
pub mod ui;

pub use health::health_routes;
pub use status::get_status;
pub use ui::serve_index;
