use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use rto_probe::server::{build_router, ServeState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::context::CliContext;
use super::driver::DriverArgs;
use super::runtime::build_boundary;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Bind address (config `server.host` when unset)
    #[arg(long)]
    pub host: Option<String>,

    /// Port (config `server.port` when unset)
    #[arg(long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub driver: DriverArgs,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let server = &ctx.config().server;
    let host = args.host.clone().unwrap_or_else(|| server.host.clone());
    let port = args.port.unwrap_or(server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {host}:{port}"))?;

    let boundary = build_boundary(ctx, &args.driver)?;
    let state = ServeState::new(Arc::new(boundary), ctx.config().request_defaults());
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, config = %ctx.config_path().display(), "serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("Server error")?;
    Ok(())
}
