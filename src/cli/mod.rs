pub mod app;
pub mod child;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod driver;
pub mod env;
pub mod flow;
pub mod run;
pub mod runtime;
pub mod serve;

pub use app::run;
