//! Occupancy grid used to animate a driver's approach to the rider
//!
//! The world stores only position lists. The occupancy grid is always derived
//! from them on demand, so it can never drift out of sync.

use std::collections::HashSet;
use std::fmt::Write as _;

use log::debug;
use pathfinding::prelude::bfs;
use rand::Rng;

use super::config::SimConfig;
use super::error::{DispatchError, DispatchResult};
use super::types::{driver_symbol, Cell, DriverId, Occupant};

const DRIVER_NAMES: [&str; 8] = [
    "Ahmed", "Sana", "Bilal", "Hira", "Usman", "Ayesha", "Hamza", "Zara",
];

const VEHICLES: [&str; 6] = ["Corolla", "Civic", "Alto", "Cultus", "Swift", "Mehran"];

/// A driver agent on the grid
#[derive(Debug, Clone, PartialEq)]
pub struct SimDriver {
    pub id: DriverId,
    pub name: String,
    pub vehicle: String,
    /// Remaining fuel, one unit per grid step
    pub fuel: u32,
    pub cell: Cell,
}

impl SimDriver {
    pub fn new(
        id: DriverId,
        name: impl Into<String>,
        vehicle: impl Into<String>,
        fuel: u32,
        cell: Cell,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            vehicle: vehicle.into(),
            fuel,
            cell,
        }
    }
}

/// Fixed-size square grid with one rider and N drivers
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: usize,
    rider: Cell,
    drivers: Vec<SimDriver>,
    obstacles: HashSet<Cell>,
    signals: Vec<Cell>,
    fuel_stations: Vec<Cell>,
    congestion_zones: Vec<Cell>,
}

impl GridWorld {
    /// Empty world with the rider in the bottom-right corner
    pub fn new(size: usize) -> Self {
        let corner = size.saturating_sub(1);
        Self {
            size,
            rider: Cell::new(corner, corner),
            drivers: Vec::new(),
            obstacles: HashSet::new(),
            signals: Vec::new(),
            fuel_stations: Vec::new(),
            congestion_zones: Vec::new(),
        }
    }

    /// Random world laid out from the config. Markers never overlap each other or the rider.
    pub fn generate<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let mut world = Self::new(config.grid_size);
        let mut taken: HashSet<Cell> = HashSet::from([world.rider]);

        let obstacles = random_cells(config.obstacle_count, config.grid_size, &mut taken, rng);
        world.obstacles = obstacles.into_iter().collect();
        world.signals = random_cells(config.signal_count, config.grid_size, &mut taken, rng);
        world.fuel_stations =
            random_cells(config.fuel_station_count, config.grid_size, &mut taken, rng);
        world.congestion_zones =
            random_cells(config.congestion_zone_count, config.grid_size, &mut taken, rng);

        let driver_cells = random_cells(config.driver_count, config.grid_size, &mut taken, rng);
        for (index, cell) in driver_cells.into_iter().enumerate() {
            world.drivers.push(SimDriver::new(
                DriverId(index),
                DRIVER_NAMES[index % DRIVER_NAMES.len()],
                VEHICLES[index % VEHICLES.len()],
                config.starting_fuel,
                cell,
            ));
        }

        debug!(
            "Generated {}x{} grid: {} obstacles, {} signals, {} fuel stations, {} congestion zones, {} drivers",
            world.size,
            world.size,
            world.obstacles.len(),
            world.signals.len(),
            world.fuel_stations.len(),
            world.congestion_zones.len(),
            world.drivers.len()
        );

        world
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rider(&self) -> Cell {
        self.rider
    }

    pub fn set_rider(&mut self, cell: Cell) -> DispatchResult<()> {
        self.check_bounds(cell)?;
        self.rider = cell;
        Ok(())
    }

    pub fn drivers(&self) -> &[SimDriver] {
        &self.drivers
    }

    pub fn driver(&self, id: DriverId) -> DispatchResult<&SimDriver> {
        self.drivers
            .iter()
            .find(|d| d.id == id)
            .ok_or(DispatchError::UnknownDriver(id))
    }

    pub fn driver_mut(&mut self, id: DriverId) -> DispatchResult<&mut SimDriver> {
        self.drivers
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(DispatchError::UnknownDriver(id))
    }

    /// Adds a driver, replacing any existing driver with the same id
    pub fn add_driver(&mut self, driver: SimDriver) -> DispatchResult<()> {
        self.check_bounds(driver.cell)?;
        match self.drivers.iter_mut().find(|d| d.id == driver.id) {
            Some(existing) => *existing = driver,
            None => self.drivers.push(driver),
        }
        Ok(())
    }

    /// Returns false if the cell already held an obstacle.
    /// The rider's cell and cells occupied by drivers cannot be blocked.
    pub fn add_obstacle(&mut self, cell: Cell) -> DispatchResult<bool> {
        self.check_bounds(cell)?;
        if cell == self.rider || self.drivers.iter().any(|d| d.cell == cell) {
            return Ok(false);
        }
        Ok(self.obstacles.insert(cell))
    }

    pub fn remove_obstacle(&mut self, cell: Cell) -> bool {
        self.obstacles.remove(&cell)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    pub fn add_signal(&mut self, cell: Cell) -> DispatchResult<()> {
        self.check_bounds(cell)?;
        self.signals.push(cell);
        Ok(())
    }

    pub fn add_fuel_station(&mut self, cell: Cell) -> DispatchResult<()> {
        self.check_bounds(cell)?;
        self.fuel_stations.push(cell);
        Ok(())
    }

    pub fn add_congestion_zone(&mut self, cell: Cell) -> DispatchResult<()> {
        self.check_bounds(cell)?;
        self.congestion_zones.push(cell);
        Ok(())
    }

    pub fn fuel_stations(&self) -> &[Cell] {
        &self.fuel_stations
    }

    fn check_bounds(&self, cell: Cell) -> DispatchResult<()> {
        if cell.in_bounds(self.size) {
            Ok(())
        } else {
            Err(DispatchError::CellOutOfBounds(cell))
        }
    }

    /// What a cell shows in the derived view. Later layers win:
    /// rider, drivers, obstacles, signals, fuel stations, congestion zones.
    pub fn occupant(&self, cell: Cell) -> Occupant {
        if self.congestion_zones.contains(&cell) {
            Occupant::CongestionZone
        } else if self.fuel_stations.contains(&cell) {
            Occupant::FuelStation
        } else if self.signals.contains(&cell) {
            Occupant::TrafficSignal
        } else if self.obstacles.contains(&cell) {
            Occupant::Obstacle
        } else if let Some(index) = self.drivers.iter().rposition(|d| d.cell == cell) {
            Occupant::Driver(index)
        } else if cell == self.rider {
            Occupant::Rider
        } else {
            Occupant::Empty
        }
    }

    /// Full occupancy grid, row-major
    pub fn occupancy(&self) -> Vec<Vec<Occupant>> {
        (0..self.size)
            .map(|row| {
                (0..self.size)
                    .map(|col| self.occupant(Cell::new(row, col)))
                    .collect()
            })
            .collect()
    }

    /// Minimum-hop path from `start` to `goal`, both ends included.
    ///
    /// Obstacles are impassable; every other marker is free to drive through.
    /// Among equally short paths the one found first in +col, -col, +row, -row
    /// neighbor order wins.
    pub fn find_path(&self, start: Cell, goal: Cell) -> DispatchResult<Vec<Cell>> {
        self.check_bounds(start)?;
        self.check_bounds(goal)?;

        bfs(
            &start,
            |cell: &Cell| {
                cell.neighbors(self.size)
                    .filter(|next| !self.obstacles.contains(next))
                    .collect::<Vec<_>>()
            },
            |cell| *cell == goal,
        )
        .ok_or(DispatchError::PathNotFound {
            from: start,
            to: goal,
        })
    }

    /// Closest fuel station by Manhattan distance; the earliest placed station wins ties
    pub fn nearest_fuel_station(&self, from: Cell) -> Option<Cell> {
        let mut nearest: Option<(Cell, usize)> = None;
        for station in &self.fuel_stations {
            let distance = from.manhattan(station);
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((*station, distance)),
            }
        }
        nearest.map(|(cell, _)| cell)
    }

    /// Drivers paired with their Manhattan ETA to the rider
    pub fn drivers_by_eta(&self) -> Vec<(&SimDriver, usize)> {
        self.drivers
            .iter()
            .map(|d| (d, d.cell.manhattan(&self.rider)))
            .collect()
    }

    /// Text map of the derived occupancy grid
    pub fn render(&self) -> String {
        let border = format!("+{}+", "-".repeat(self.size * 2));
        let mut out = String::new();
        let _ = writeln!(out, "{border}");
        for row in self.occupancy() {
            out.push('|');
            for occupant in row {
                out.push(occupant.symbol());
                out.push(' ');
            }
            out.push_str("|\n");
        }
        let _ = writeln!(out, "{border}");
        out
    }

    pub fn legend(&self) -> String {
        let mut out = String::from("Legend:\nU : Rider\n");
        for (index, driver) in self.drivers.iter().enumerate() {
            let _ = writeln!(out, "{} : {}", driver_symbol(index), driver.name);
        }
        out.push_str("# : Obstacle\nT : Traffic Signal\nF : Fuel Station\nR : Congestion Zone\n");
        out
    }
}

/// Picks `count` distinct random cells not already in `taken`, marking them taken
fn random_cells<R: Rng + ?Sized>(
    count: usize,
    size: usize,
    taken: &mut HashSet<Cell>,
    rng: &mut R,
) -> Vec<Cell> {
    let free = (size * size).saturating_sub(taken.len());
    let count = count.min(free);
    let mut cells = Vec::with_capacity(count);
    while cells.len() < count {
        let cell = Cell::new(rng.random_range(0..size), rng.random_range(0..size));
        if taken.insert(cell) {
            cells.push(cell);
        }
    }
    cells
}
