use std::net::SocketAddr;

use anyhow::Result;

use commentpulse::{Analyzer, Broadcaster, Config, LiveServer};

pub async fn cmd_monitor(config: &Config, url: &str, bind: Option<SocketAddr>) -> Result<()> {
    let analyzer = Analyzer::from_config(config);
    let broadcaster = Broadcaster::new();

    let server = LiveServer::bind(bind.unwrap_or(config.server.bind), broadcaster.clone()).await?;
    let addr = server.local_addr()?;
    let server_task = tokio::spawn(server.run());

    let handle = analyzer.monitor(url, broadcaster)?;
    eprintln!("📡 Monitoring {url}");
    eprintln!("   Live updates on ws://{addr} (Ctrl+C to stop)");

    tokio::signal::ctrl_c().await?;
    eprintln!("\n⏹  Stopping after the current cycle...");
    handle.stop().await;
    server_task.abort();
    Ok(())
}
