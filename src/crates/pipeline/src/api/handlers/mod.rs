//! API request handlers, one module per resource

pub mod generate;
pub mod health;
pub mod runs;
pub mod steps;

pub use generate::generate;
pub use health::{health, health_detailed};
pub use runs::{get_post, get_run};
pub use steps::invoke_step;
