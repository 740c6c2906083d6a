//! End-to-end walkthrough of the gateway against a live Neo4j
//!
//! Run with: cargo run --example gateway_demo
//!
//! Connection details come from NEO4J_* variables (or a `.env` file).

use anyhow::Context;
use kg_gateway::{
    format_search_results, logging, Episode, GatewayService, GatewaySettings, HealthState,
    Neo4jBackend,
};
use serde_json::json;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = GatewaySettings::load().context("invalid configuration")?;
    logging::init_logging(settings.log_level)?;

    info!("Settings: {:?}", settings);

    let backend = Neo4jBackend::new(settings.neo4j_config());
    let gateway = GatewayService::new(backend, settings.gateway_config())?;

    println!("=== Health before initialize ===");
    let report = gateway.get_health_status().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    gateway
        .initialize()
        .await
        .context("failed to connect to Neo4j")?;

    let report = gateway.get_health_status().await;
    if report.status != HealthState::Healthy {
        warn!("Backend unhealthy: {:?}", report.error);
    }
    println!("\n=== Health after initialize ===");
    println!("{}", serde_json::to_string_pretty(&report)?);

    println!("\n=== Adding episodes ===");
    gateway
        .add_text_episode("demo-meeting", "Alice met Bob at the Seoul office")
        .await?;
    gateway
        .add_json_episode(
            "demo-profile",
            &json!({"name": "Alice", "role": "engineer", "city": "서울"}),
        )
        .await?;
    gateway
        .add_episode(
            Episode::text("demo-import", "Bob joined Acme in 2023").with_dedup_key("demo-import#0"),
        )
        .await?;
    println!("3 episodes added");

    println!("\n=== Searching ===");
    let hits = gateway.search("Alice", None, None).await?;
    println!("{}", format_search_results(&hits));

    // Served from the cache
    let _ = gateway.search("Alice", None, None).await?;
    println!("\n=== Cache ===");
    println!("{}", gateway.get_cache_stats().await);

    let nodes = gateway.node_search("Alice", Some(3)).await?;
    println!("\n=== Nodes ===");
    for node in nodes {
        println!("- {} ({})", node.name, node.uuid);
    }

    gateway.close().await?;
    Ok(())
}
