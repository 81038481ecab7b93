//! Core types for the dispatch simulation
//!
//! Plain value types shared by the grid, the route graph and the scheduler.

use std::fmt;

/// Default side length of the square simulation grid
pub const GRID_SIZE: usize = 20;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A driver identifier. Ordering is used as the matching tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(pub usize);

/// A rider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RiderId(pub usize);

/// A location node identifier in the route graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver#{}", self.0)
    }
}

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rider#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A position on the simulation grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// |Δrow| + |Δcol|
    pub fn manhattan(&self, other: &Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    pub fn in_bounds(&self, size: usize) -> bool {
        self.row < size && self.col < size
    }

    /// The 4-connected neighbors inside the grid, in +col, -col, +row, -row order.
    /// Path tie-breaking depends on this order.
    pub fn neighbors(&self, size: usize) -> impl Iterator<Item = Cell> {
        let Cell { row, col } = *self;
        let candidates = [
            (Some(row), col.checked_add(1)),
            (Some(row), col.checked_sub(1)),
            (row.checked_add(1), Some(col)),
            (row.checked_sub(1), Some(col)),
        ];
        candidates.into_iter().filter_map(move |(r, c)| {
            let cell = Cell::new(r?, c?);
            cell.in_bounds(size).then_some(cell)
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometers (haversine formula)
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// Anything the scheduler can measure a pickup distance between
pub trait Locatable: Copy + fmt::Debug {
    fn distance_to(&self, other: &Self) -> f64;
}

impl Locatable for Cell {
    fn distance_to(&self, other: &Self) -> f64 {
        self.manhattan(other) as f64
    }
}

impl Locatable for GeoPoint {
    fn distance_to(&self, other: &Self) -> f64 {
        self.haversine_km(other)
    }
}

/// What occupies a grid cell in the derived occupancy view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Rider,
    /// Index into the world's driver list
    Driver(usize),
    Obstacle,
    TrafficSignal,
    FuelStation,
    CongestionZone,
}

impl Occupant {
    /// Single-character map symbol
    pub fn symbol(&self) -> char {
        match self {
            Occupant::Empty => '.',
            Occupant::Rider => 'U',
            Occupant::Driver(index) => driver_symbol(*index),
            Occupant::Obstacle => '#',
            Occupant::TrafficSignal => 'T',
            Occupant::FuelStation => 'F',
            Occupant::CongestionZone => 'R',
        }
    }

    pub fn is_passable(&self) -> bool {
        !matches!(self, Occupant::Obstacle)
    }
}

/// Drivers are drawn as A, B, C, ... wrapping after Z
pub fn driver_symbol(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
