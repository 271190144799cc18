// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! corekv-server: runs the reactor until a fatal error or signal.

use anyhow::{Context, Result};
use clap::Parser;
use corekv::reactor::poller::LibcPoller;
use corekv::{Engine, EngineConfig};

/// Single-threaded, event-driven in-memory key-value server.
#[derive(Parser, Debug)]
#[command(name = "corekv-server", version, about)]
struct Cli {
    /// Port to bind on all interfaces.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_PORT)]
    port: u16,

    /// Milliseconds of inactivity before a connection is closed.
    #[arg(long, default_value_t = 5_000)]
    idle_timeout_ms: i64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = EngineConfig::default().with_port(cli.port).with_idle_timeout_ms(cli.idle_timeout_ms);

    tracing::info!(bind_addr = %config.bind_addr, "starting corekv-server");
    let mut engine = Engine::bind(config).context("failed to bind listener")?;
    let mut poller = LibcPoller;
    engine.run(&mut poller).context("reactor loop terminated")?;
    Ok(())
}
