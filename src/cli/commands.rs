use clap::Subcommand;

use super::child::ChildArgs;
use super::flow::FlowArgs;
use super::run::RunArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Serve the HTTP API (`POST /run`, `GET /health`)
    Serve(ServeArgs),

    /// Run one lookup and print the result as JSON
    Run(RunArgs),

    /// Child side of the isolation boundary
    #[command(hide = true)]
    Child(ChildArgs),

    /// Print the effective flow definition as YAML
    Flow(FlowArgs),
}
