//! Error values returned by the dispatch and routing core
//!
//! These are outcomes the caller reacts to (re-queue, pick another driver,
//! tell the rider). None of them are fatal to the process.

use std::fmt;

use super::types::{Cell, DriverId, NodeId, RiderId};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    UnknownRider(RiderId),
    UnknownDriver(DriverId),
    /// The rider exists but has no driver assigned
    NotAssigned(RiderId),
    UnknownNode(NodeId),
    /// No directed edge between the two nodes
    UnknownEdge(NodeId, NodeId),
    InvalidWeight(f64),
    InvalidCongestion(f64),
    CellOutOfBounds(Cell),
    PathNotFound { from: Cell, to: Cell },
    /// The planned path crossed a cell that became an obstacle after planning
    PathBlocked(Cell),
    RouteUnreachable { from: NodeId, to: NodeId },
    OutOfFuel(DriverId),
    Cancelled(DriverId),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownRider(id) => write!(f, "unknown rider {id}"),
            DispatchError::UnknownDriver(id) => write!(f, "unknown driver {id}"),
            DispatchError::NotAssigned(id) => write!(f, "{id} has no assigned driver"),
            DispatchError::UnknownNode(id) => write!(f, "unknown location {id}"),
            DispatchError::UnknownEdge(from, to) => {
                write!(f, "no road from {from} to {to}")
            }
            DispatchError::InvalidWeight(w) => write!(f, "invalid edge weight {w}"),
            DispatchError::InvalidCongestion(c) => {
                write!(f, "invalid congestion factor {c} (must be > 0)")
            }
            DispatchError::CellOutOfBounds(cell) => write!(f, "cell {cell} is outside the grid"),
            DispatchError::PathNotFound { from, to } => {
                write!(f, "no path from {from} to {to}")
            }
            DispatchError::PathBlocked(cell) => write!(f, "path blocked at {cell}"),
            DispatchError::RouteUnreachable { from, to } => {
                write!(f, "{to} is unreachable from {from}")
            }
            DispatchError::OutOfFuel(id) => write!(f, "{id} ran out of fuel"),
            DispatchError::Cancelled(id) => write!(f, "trip for {id} was cancelled"),
        }
    }
}

impl std::error::Error for DispatchError {}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
