//! Tunable parameters for building a simulated city

use anyhow::{bail, Result};

use super::types::GRID_SIZE;

/// Fuel units a driver starts with (one unit per grid step)
pub const DEFAULT_FUEL: u32 = 50;

/// Number of drivers placed on the grid
pub const DEFAULT_DRIVER_COUNT: usize = 3;

/// Pause between animation ticks
pub const DEFAULT_TICK_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub grid_size: usize,
    pub driver_count: usize,
    pub obstacle_count: usize,
    pub signal_count: usize,
    pub fuel_station_count: usize,
    pub congestion_zone_count: usize,
    pub starting_fuel: u32,
    pub tick_ms: u64,
    /// Seed for reproducible worlds; a fresh entropy-seeded RNG when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::for_grid(GRID_SIZE)
    }
}

impl SimConfig {
    /// Marker counts scale with the grid side the same way the classic 20x20 layout does
    pub fn for_grid(grid_size: usize) -> Self {
        Self {
            grid_size,
            driver_count: DEFAULT_DRIVER_COUNT,
            obstacle_count: grid_size / 2,
            signal_count: grid_size / 4,
            fuel_station_count: grid_size / 5,
            congestion_zone_count: grid_size / 4,
            starting_fuel: DEFAULT_FUEL,
            tick_ms: DEFAULT_TICK_MS,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Cells needed for every marker plus the rider
    pub fn cells_required(&self) -> usize {
        1 + self.driver_count
            + self.obstacle_count
            + self.signal_count
            + self.fuel_station_count
            + self.congestion_zone_count
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            bail!("grid size must be at least 2, got {}", self.grid_size);
        }
        if self.driver_count == 0 {
            bail!("at least one driver is required");
        }
        let cells = self.grid_size * self.grid_size;
        if self.cells_required() > cells {
            bail!(
                "{} markers do not fit on a {}x{} grid",
                self.cells_required(),
                self.grid_size,
                self.grid_size
            );
        }
        Ok(())
    }
}
