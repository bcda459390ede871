//! `dispatch-sim`: loads an orders/couriers dataset, runs the tick-driven
//! simulator under a chosen dispatch strategy, and reports fleet KPIs as
//! JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dispatch_core::config::Config;
use dispatch_core::dispatch::Strategy;
use dispatch_core::geo::{GeoDist, Haversine};
use dispatch_core::loader;
use dispatch_core::simulator::Simulator;

#[derive(Parser, Debug)]
#[command(name = "dispatch-sim", about = "Last-mile dispatch strategy simulator")]
struct Args {
    /// Path to the orders CSV.
    #[arg(long)]
    orders: PathBuf,

    /// Path to the couriers CSV.
    #[arg(long)]
    couriers: PathBuf,

    /// Dispatch strategy: baseline, sequential, combinatorial, or adaptive.
    #[arg(long)]
    strategy: String,

    /// Optional JSON file overlaying fields onto the default configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the KPI report JSON. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Tracing log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Selects the GeoDist backend per `use_road_distance`. The road-network
/// façade only exists when compiled with the `road-distance` feature; a
/// request for it otherwise falls back to Haversine with a warning, same
/// as a live road-service failure would.
fn build_geo(config: &Config) -> Box<dyn GeoDist> {
    if config.use_road_distance {
        #[cfg(feature = "road-distance")]
        {
            return Box::new(dispatch_core::geo::road::RoadNetwork::new(
                std::env::var("OSRM_ENDPOINT").unwrap_or_else(|_| "http://localhost:5000".to_string()),
                config.road_timeout_secs,
                config.geo_cache_size,
                config.road_table_max_locations,
                config.haversine_fallback_multiplier,
            ));
        }
        #[cfg(not(feature = "road-distance"))]
        {
            tracing::warn!("use_road_distance is set but the road-distance feature is not compiled in; falling back to haversine");
        }
    }
    Box::new(Haversine::new(config.geo_cache_size))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("dispatch_core={0},dispatch_cli={0}", args.log_level))
        .init();

    let strategy = Strategy::parse(&args.strategy)
        .with_context(|| format!("unknown strategy {:?}; expected one of baseline/sequential/combinatorial/adaptive", args.strategy))?;

    let config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
            Config::from_json(&raw).context("parsing config overlay")?
        }
        None => Config::default(),
    };

    let orders = loader::load_orders(&args.orders).with_context(|| format!("loading orders from {}", args.orders.display()))?;
    let couriers = loader::load_couriers(&args.couriers).with_context(|| format!("loading couriers from {}", args.couriers.display()))?;

    tracing::info!(
        strategy = strategy.name(),
        orders = orders.len(),
        couriers = couriers.len(),
        "starting simulation"
    );

    let geo = build_geo(&config);
    let mut simulator = Simulator::new(orders, couriers, config, geo);
    let report = simulator.run(strategy);

    let json = serde_json::to_string_pretty(&report).context("serializing KPI report")?;
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{json}"),
    }

    tracing::info!(
        orders_delivered = report.orders_delivered,
        drivers_used = report.drivers_used,
        success_rate = report.success_rate,
        "simulation complete"
    );

    Ok(())
}
