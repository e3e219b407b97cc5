//! The read side of the service.
//!
//! [`QueryService`] answers questions against the current leaderboard snapshot and forwards
//! crawl requests to the crawler. The views render its answers as HTML, and [`router`] exposes
//! them over HTTP.

mod query;
mod routes;
mod views;

pub use query::{HomeView, QueryService};
pub use routes::router;
pub use views::{render_crawl, render_error, render_find, render_home, render_user};
