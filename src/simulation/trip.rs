//! Stepwise movement of a driver along a planned grid path

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::error::{DispatchError, DispatchResult};
use super::grid_world::GridWorld;
use super::types::{Cell, DriverId};

/// Result of advancing a trip by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStep {
    /// Driver moved to this cell and is still en route
    Moved(Cell),
    Arrived,
    /// Tank is empty before reaching the rider
    OutOfFuel,
    /// Next cell became an obstacle after the path was planned
    Blocked(Cell),
}

/// How a finished trip ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripOutcome {
    Arrived {
        steps: usize,
    },
    OutOfFuel {
        at: Cell,
        nearest_station: Option<Cell>,
    },
}

impl TripOutcome {
    /// Steps taken on arrival; running dry is reported as an error
    pub fn arrived(self, driver: DriverId) -> DispatchResult<usize> {
        match self {
            TripOutcome::Arrived { steps } => Ok(steps),
            TripOutcome::OutOfFuel { .. } => Err(DispatchError::OutOfFuel(driver)),
        }
    }
}

/// Shared flag used to stop a running trip
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both tokens are clones of the same flag
    pub(crate) fn shares_flag(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One driver's progress toward the rider
#[derive(Debug, Clone)]
pub struct TripSimulation {
    pub driver: DriverId,
    pub target: Cell,
    /// Remaining cells to visit, the driver's current cell excluded
    path: VecDeque<Cell>,
    steps: usize,
}

impl TripSimulation {
    /// Plans the trip with a fresh grid path from the driver's cell to `target`
    pub fn plan(world: &GridWorld, driver: DriverId, target: Cell) -> DispatchResult<Self> {
        let start = world.driver(driver)?.cell;
        let path = world.find_path(start, target).inspect_err(|_| {
            warn!("No valid path for {} from {} to {}", driver, start, target);
        })?;
        debug!("{} planned {} step(s) to {}", driver, path.len() - 1, target);
        Ok(Self::from_path(driver, target, path))
    }

    /// Uses an existing path whose first cell is the driver's current cell
    pub fn from_path(driver: DriverId, target: Cell, path: Vec<Cell>) -> Self {
        let mut path: VecDeque<Cell> = path.into();
        path.pop_front();
        Self {
            driver,
            target,
            path,
            steps: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.path.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Moves the driver one cell and burns one unit of fuel
    pub fn step(&mut self, world: &mut GridWorld) -> DispatchResult<TripStep> {
        let driver = world.driver(self.driver)?;
        if driver.cell == self.target {
            return Ok(TripStep::Arrived);
        }
        if driver.fuel == 0 {
            return Ok(TripStep::OutOfFuel);
        }

        let Some(next) = self.path.front().copied() else {
            // Ran out of path without reaching the rider
            return Err(DispatchError::PathNotFound {
                from: driver.cell,
                to: self.target,
            });
        };
        if world.is_obstacle(next) {
            return Ok(TripStep::Blocked(next));
        }

        self.path.pop_front();
        self.steps += 1;
        let driver = world.driver_mut(self.driver)?;
        driver.cell = next;
        driver.fuel -= 1;

        if next == self.target {
            Ok(TripStep::Arrived)
        } else {
            Ok(TripStep::Moved(next))
        }
    }

    /// Advances the trip until arrival, out of fuel or failure. `on_tick` sees
    /// the world after every move; `tick` is slept between moves.
    pub fn run(
        mut self,
        world: &mut GridWorld,
        tick: Duration,
        cancel: &CancelToken,
        mut on_tick: impl FnMut(&GridWorld, TripStep),
    ) -> DispatchResult<TripOutcome> {
        loop {
            if cancel.is_cancelled() {
                info!("Trip for {} cancelled", self.driver);
                return Err(DispatchError::Cancelled(self.driver));
            }

            let step = self.step(world)?;
            on_tick(world, step);

            match step {
                TripStep::Moved(_) => {}
                other => return self.finish(world, other),
            }

            if !tick.is_zero() {
                thread::sleep(tick);
            }
        }
    }

    /// Turns a terminal step into the trip's outcome
    pub fn finish(&self, world: &GridWorld, step: TripStep) -> DispatchResult<TripOutcome> {
        match step {
            TripStep::Arrived => {
                info!("{} has arrived at the rider", self.driver);
                Ok(TripOutcome::Arrived { steps: self.steps })
            }
            TripStep::OutOfFuel => {
                let at = world.driver(self.driver)?.cell;
                let nearest_station = world.nearest_fuel_station(at);
                warn!(
                    "{} ran out of fuel at {} (nearest station {:?})",
                    self.driver, at, nearest_station
                );
                Ok(TripOutcome::OutOfFuel {
                    at,
                    nearest_station,
                })
            }
            TripStep::Blocked(cell) => {
                warn!("Path for {} blocked at {}", self.driver, cell);
                Err(DispatchError::PathBlocked(cell))
            }
            TripStep::Moved(cell) => Err(DispatchError::PathNotFound {
                from: cell,
                to: self.target,
            }),
        }
    }
}
