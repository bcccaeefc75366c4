pub mod app;
pub mod check;
pub mod env;
pub mod run;
pub mod runtime;

pub use check::{cmd_check, CheckArgs};
pub use run::{cmd_run, RunArgs};
