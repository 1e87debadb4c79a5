//! Google Calendar backend for visual-planner.
//!
//! Credentials and tokens live under the provider's config directory:
//!   ~/.config/visual-planner/providers/google/app_config.toml
//!   ~/.config/visual-planner/providers/google/session.toml

mod api;
mod app_config;
mod oauth;
mod session;
mod types;

pub use api::{GOOGLE_CALENDAR_API_BASE, GoogleCalendar};
pub use app_config::AppConfig;
pub use oauth::{GoogleAuthorizer, OAuthEndpoints};
pub use session::{SessionData, SessionStore};
