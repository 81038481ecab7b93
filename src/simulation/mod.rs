//! Ride dispatch and routing core
//!
//! Matching riders to drivers, macro routing over the city graph and
//! obstacle-aware grid paths for the pickup leg. Nothing in here does I/O
//! beyond logging and the explicit print helpers on `City`.

mod center;
mod city;
mod config;
mod error;
mod grid_world;
mod route_graph;
mod scheduler;
mod trip;
mod types;

pub use center::DispatchCenter;
pub use city::{City, GRID_RIDER};
pub use config::{SimConfig, DEFAULT_DRIVER_COUNT, DEFAULT_FUEL, DEFAULT_TICK_MS};
pub use error::{DispatchError, DispatchResult};
pub use grid_world::{GridWorld, SimDriver};
pub use route_graph::{Location, Route, RouteEdge, RouteGraph};
pub use scheduler::{
    DispatchScheduler, DispatchSnapshot, DriverRecord, DriverState, Match, PendingRequest,
    RideOutcome, RiderRecord, RiderState,
};
pub use trip::{CancelToken, TripOutcome, TripSimulation, TripStep};
pub use types::{
    driver_symbol, Cell, DriverId, GeoPoint, Locatable, NodeId, Occupant, RiderId, GRID_SIZE,
};
