//! Ride Dispatch Library
//!
//! Matches riders to the nearest available driver, plans city routes over a
//! congestion-weighted graph and animates the pickup on an obstacle grid.

pub mod simulation;
