//! The simulated city: grid, route graph and scheduler wired together
//!
//! This is the single owner of all mutable dispatch state. Every operation
//! takes it explicitly; there are no globals.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::SimConfig;
use super::error::{DispatchError, DispatchResult};
use super::grid_world::GridWorld;
use super::route_graph::RouteGraph;
use super::scheduler::{
    DispatchScheduler, DispatchSnapshot, DriverRecord, DriverState, Match, RideOutcome,
    RiderRecord,
};
use super::trip::{CancelToken, TripOutcome, TripSimulation, TripStep};
use super::types::{Cell, DriverId, RiderId};

/// The rider standing on the grid's rider cell
pub const GRID_RIDER: RiderId = RiderId(0);

pub struct City {
    pub grid: GridWorld,
    pub routes: RouteGraph,
    pub scheduler: DispatchScheduler<Cell>,
    /// Seed the grid was generated from, if it was generated
    pub seed: Option<u64>,
}

impl City {
    /// Random city from the config, using the demo route graph
    pub fn generate(config: &SimConfig) -> Result<Self> {
        config.validate().context("Invalid simulation config")?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        info!("Generating city with seed {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let grid = GridWorld::generate(config, &mut rng);
        let routes = RouteGraph::demo_city().context("Invalid demo route table")?;
        let mut city = Self::from_parts(grid, routes);
        city.seed = Some(seed);
        Ok(city)
    }

    /// Builds the scheduler from the grid: every grid driver starts available,
    /// the grid rider is registered as `GRID_RIDER`.
    pub fn from_parts(grid: GridWorld, routes: RouteGraph) -> Self {
        let mut scheduler = DispatchScheduler::new();
        scheduler.load_drivers(
            grid.drivers()
                .iter()
                .map(|d| DriverRecord::new(d.id, d.cell, true)),
        );
        scheduler.load_riders([RiderRecord::new(GRID_RIDER, grid.rider())]);

        Self {
            grid,
            routes,
            scheduler,
            seed: None,
        }
    }

    /// Registers an extra rider at a grid cell
    pub fn add_rider(&mut self, rider: RiderId, cell: Cell) -> DispatchResult<()> {
        if !cell.in_bounds(self.grid.size()) {
            return Err(DispatchError::CellOutOfBounds(cell));
        }
        self.scheduler.load_riders([RiderRecord::new(rider, cell)]);
        Ok(())
    }

    pub fn request_ride(&mut self, rider: RiderId) -> DispatchResult<RideOutcome> {
        self.scheduler.request_ride(rider)
    }

    pub fn mark_driver_available(&mut self, driver: DriverId) -> DispatchResult<Vec<Match>> {
        self.scheduler.mark_driver_available(driver)
    }

    pub fn snapshot(&self) -> DispatchSnapshot<Cell> {
        self.scheduler.snapshot()
    }

    /// Grid path from the driver to the rider's pickup cell
    pub fn plan_trip(&self, rider: RiderId, driver: DriverId) -> DispatchResult<TripSimulation> {
        let target = self.scheduler.rider(rider)?.location;
        TripSimulation::plan(&self.grid, driver, target)
    }

    /// Advances a trip by one cell and mirrors the new position into the scheduler
    pub fn step_trip(&mut self, trip: &mut TripSimulation) -> DispatchResult<TripStep> {
        let step = trip.step(&mut self.grid)?;
        let cell = self.grid.driver(trip.driver)?.cell;
        self.scheduler.update_driver_location(trip.driver, cell)?;
        Ok(step)
    }

    /// True while `driver` is still the one serving `rider`
    pub fn holds_assignment(&self, rider: RiderId, driver: DriverId) -> bool {
        self.scheduler.assignment(rider) == Some(driver)
    }

    /// Closes out a trip: arrival completes the ride, anything else gives the
    /// driver back to the pool and returns the rider to idle.
    ///
    /// Nothing is touched once the pair no longer holds the assignment; whoever
    /// broke it (a cancel, a manual release) already settled the driver.
    pub fn settle_trip(
        &mut self,
        rider: RiderId,
        driver: DriverId,
        result: DispatchResult<TripOutcome>,
    ) -> DispatchResult<TripOutcome> {
        let owned = self.holds_assignment(rider, driver);
        match result {
            Ok(TripOutcome::Arrived { steps }) if owned => {
                self.scheduler.complete_ride(rider)?;
                Ok(TripOutcome::Arrived { steps })
            }
            Ok(TripOutcome::Arrived { .. }) => Err(DispatchError::Cancelled(driver)),
            Ok(outcome) => {
                // Stranded driver: the rider goes back to idle so it can request again
                if owned {
                    self.scheduler.cancel_ride(rider)?;
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!("Trip for {} with {} abandoned: {}", rider, driver, err);
                if owned {
                    self.scheduler.cancel_ride(rider)?;
                }
                Err(err)
            }
        }
    }

    /// Requests a ride for the rider and, once matched, drives the assigned
    /// driver to the pickup cell. Returns `Ok(None)` when the rider was queued.
    pub fn dispatch(
        &mut self,
        rider: RiderId,
        tick: Duration,
        cancel: &CancelToken,
        on_tick: impl FnMut(&GridWorld, TripStep),
    ) -> DispatchResult<Option<(DriverId, TripOutcome)>> {
        let driver = match self.request_ride(rider)? {
            RideOutcome::Matched(matched) => matched.driver,
            RideOutcome::AlreadyAssigned(driver) => driver,
            RideOutcome::Queued => return Ok(None),
        };

        let result = self
            .plan_trip(rider, driver)
            .and_then(|trip| self.run_planned(trip, tick, cancel, on_tick));
        self.settle_trip(rider, driver, result)
            .map(|outcome| Some((driver, outcome)))
    }

    fn run_planned(
        &mut self,
        trip: TripSimulation,
        tick: Duration,
        cancel: &CancelToken,
        on_tick: impl FnMut(&GridWorld, TripStep),
    ) -> DispatchResult<TripOutcome> {
        let driver = trip.driver;
        let result = trip.run(&mut self.grid, tick, cancel, on_tick);
        let cell = self.grid.driver(driver)?.cell;
        self.scheduler.update_driver_location(driver, cell)?;
        result
    }

    /// Print a summary of the city state
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        println!("=== Ride Dispatch Summary ===");
        if let Some(seed) = self.seed {
            println!("Seed: {}", seed);
        }
        println!(
            "Grid: {}x{}, Locations: {}, Roads: {}",
            self.grid.size(),
            self.grid.size(),
            self.routes.location_count(),
            self.routes.edge_count()
        );
        println!(
            "Drivers: {} ({} available), Pending requests: {}",
            snapshot.drivers.len(),
            snapshot.available_count(),
            snapshot.pending.len()
        );
        println!();

        println!("--- Drivers ---");
        for (driver, eta) in self.grid.drivers_by_eta() {
            let state = self
                .scheduler
                .driver(driver.id)
                .map(|d| match d.state {
                    DriverState::Available => "available",
                    DriverState::Assigned => "assigned",
                })
                .unwrap_or("unregistered");
            println!(
                "  {}. {} (Car: {}, Fuel: {}, Location: {}, ETA: {}) [{}]",
                driver.id.0 + 1,
                driver.name,
                driver.vehicle,
                driver.fuel,
                driver.cell,
                eta,
                state
            );
        }

        if !snapshot.assignments.is_empty() {
            println!("--- Assignments ---");
            for (rider, driver) in &snapshot.assignments {
                println!("  {} -> {}", rider, driver);
            }
        }
    }

    /// Draw the grid and its legend in the terminal
    pub fn draw_map(&self) {
        println!("{}", self.grid.render());
        println!("{}", self.grid.legend());
    }

    /// Locations the route graph covers
    pub fn print_locations(&self) {
        println!("Available locations:");
        for location in self.routes.locations() {
            println!("    {}: {}", location.id.0, location.name);
        }
    }
}
