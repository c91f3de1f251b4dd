//! Per-tick simulation core for Eco Ranger, a top-down cleanup game.
//!
//! [`GameSession`] owns the world and advances it one fixed tick at a time;
//! [`GameSnapshot`] is the read-only view a frontend renders from.

mod app;

pub use app::bootstrap::{build_app, AppWiring, BootstrapError};
pub use app::gameplay::*;
pub use app::loop_runner::run;
