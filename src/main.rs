use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use ride_dispatch::simulation::{
    self, CancelToken, City, DispatchError, NodeId, SimConfig, TripOutcome, TripStep, GRID_RIDER,
    GRID_SIZE,
};

#[derive(Parser)]
#[command(name = "ride_dispatch")]
#[command(about = "Ride dispatch and routing simulation")]
struct Cli {
    /// Seed for a reproducible city
    #[arg(long)]
    seed: Option<u64>,

    /// Side length of the square grid
    #[arg(long, default_value_t = GRID_SIZE)]
    grid_size: usize,

    /// Number of drivers placed on the grid
    #[arg(long, default_value_t = simulation::DEFAULT_DRIVER_COUNT)]
    drivers: usize,

    /// Starting fuel per driver
    #[arg(long, default_value_t = simulation::DEFAULT_FUEL)]
    fuel: u32,

    /// Delay between animation ticks in milliseconds
    #[arg(long, default_value_t = simulation::DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Pickup location id in the city graph
    #[arg(long, default_value = "1")]
    from: u32,

    /// Destination location id in the city graph
    #[arg(long, default_value = "5")]
    to: u32,

    /// Congestion update applied before routing, as FROM:TO:FACTOR (repeatable)
    #[arg(long, value_parser = parse_congestion)]
    congestion: Vec<(u32, u32, f64)>,

    /// Skip drawing the grid on every tick
    #[arg(long)]
    no_map: bool,
}

fn parse_congestion(value: &str) -> std::result::Result<(u32, u32, f64), String> {
    let parts: Vec<&str> = value.split(':').collect();
    let [from, to, factor] = parts.as_slice() else {
        return Err(format!("expected FROM:TO:FACTOR, got '{value}'"));
    };
    let from = from.parse().map_err(|e| format!("bad FROM '{from}': {e}"))?;
    let to = to.parse().map_err(|e| format!("bad TO '{to}': {e}"))?;
    let factor = factor
        .parse()
        .map_err(|e| format!("bad FACTOR '{factor}': {e}"))?;
    Ok((from, to, factor))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,ride_dispatch=info"),
    )
    .init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run one dispatch in the terminal
fn run_headless(cli: &Cli) -> Result<()> {
    let mut config = SimConfig::for_grid(cli.grid_size);
    config.driver_count = cli.drivers;
    config.starting_fuel = cli.fuel;
    config.tick_ms = cli.tick_ms;
    config.seed = cli.seed;

    let mut city = City::generate(&config)?;

    println!("Initial state:");
    city.print_summary();
    if !cli.no_map {
        city.draw_map();
    }
    println!();

    // Macro route for display and ETA
    for (from, to, factor) in &cli.congestion {
        city.routes
            .update_congestion(NodeId(*from), NodeId(*to), *factor)
            .with_context(|| format!("Cannot apply congestion {from}:{to}:{factor}"))?;
    }
    city.print_locations();
    match city.routes.shortest_route(NodeId(cli.from), NodeId(cli.to)) {
        Ok(route) => {
            println!("Shortest route: {}", route.describe(&city.routes));
            println!("Expected time: {:.1} minutes", route.total_cost);
        }
        Err(err @ DispatchError::RouteUnreachable { .. }) => println!("{err}"),
        Err(err) => return Err(err).context("Invalid route request"),
    }
    println!();

    let tick = Duration::from_millis(config.tick_ms);
    let cancel = CancelToken::new();
    let draw = !cli.no_map;
    let outcome = city.dispatch(GRID_RIDER, tick, &cancel, |grid, step| {
        if draw {
            println!("{}", grid.render());
        }
        if let TripStep::Moved(cell) = step {
            println!("Driver is en route... now at {cell}");
        }
    });

    let trip_summary = match &outcome {
        Ok(Some((driver, TripOutcome::Arrived { steps }))) => {
            let name = city.grid.driver(*driver).map(|d| d.name.clone())?;
            println!("\nDriver {name} has arrived at your location!");
            format!("arrived after {steps} step(s)")
        }
        Ok(Some((_, TripOutcome::OutOfFuel { at, nearest_station }))) => {
            println!("\nDriver ran out of fuel at {at}.");
            match nearest_station {
                Some(station) => format!("out of fuel at {at}, nearest station {station}"),
                None => format!("out of fuel at {at}"),
            }
        }
        Ok(None) => "rider queued".to_string(),
        Err(err) => {
            warn!("Dispatch attempt failed: {}", err);
            format!("failed: {err}")
        }
    };

    println!("=== Final State ===");
    city.print_summary();
    if !cli.no_map {
        city.draw_map();
    }

    let snapshot = city.snapshot();
    info!("=== DISPATCH COMPLETE ===");
    info!("Rides requested: 1");
    info!(
        "Rides matched: {}",
        if matches!(outcome, Ok(None)) { 0 } else { 1 }
    );
    info!("Riders still queued: {}", snapshot.pending.len());
    info!("Drivers available: {}", snapshot.available_count());
    info!("Trip outcome: {}", trip_summary);

    Ok(())
}
