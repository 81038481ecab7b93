//! Driver matching and the pending-request queue
//!
//! Each match attempt rebuilds a distance-ordered set of the currently
//! available drivers against the requesting rider, because drivers move
//! between requests and a stale ordering would pick the wrong one.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::{debug, info, warn};
use ordered_float::OrderedFloat;

use super::error::{DispatchError, DispatchResult};
use super::types::{DriverId, Locatable, RiderId};

/// Dispatch lifecycle of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Available,
    Assigned,
}

/// Dispatch lifecycle of a rider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderState {
    /// Known but has not asked for a ride
    Idle,
    Pending,
    Assigned(DriverId),
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverRecord<P> {
    pub id: DriverId,
    pub location: P,
    pub state: DriverState,
}

impl<P> DriverRecord<P> {
    pub fn new(id: DriverId, location: P, available: bool) -> Self {
        Self {
            id,
            location,
            state: if available {
                DriverState::Available
            } else {
                DriverState::Assigned
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderRecord<P> {
    pub id: RiderId,
    pub location: P,
}

impl<P> RiderRecord<P> {
    pub fn new(id: RiderId, location: P) -> Self {
        Self { id, location }
    }
}

/// A rider paired with a driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub rider: RiderId,
    pub driver: DriverId,
    pub distance: f64,
}

/// What happened to a ride request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RideOutcome {
    Matched(Match),
    Queued,
    /// The rider already has a driver
    AlreadyAssigned(DriverId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub rider: RiderId,
    /// Logical request time, monotonic per scheduler
    pub requested_at: u64,
}

/// Read-only view of the scheduler for display
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSnapshot<P> {
    pub drivers: Vec<DriverRecord<P>>,
    pub pending: Vec<PendingRequest>,
    /// Active rider -> driver assignments, ordered by rider id
    pub assignments: Vec<(RiderId, DriverId)>,
}

impl<P> DispatchSnapshot<P> {
    pub fn available_count(&self) -> usize {
        self.drivers
            .iter()
            .filter(|d| d.state == DriverState::Available)
            .count()
    }
}

#[derive(Debug, Clone)]
struct RiderEntry<P> {
    record: RiderRecord<P>,
    state: RiderState,
}

#[derive(Debug, Clone)]
pub struct DispatchScheduler<P> {
    drivers: BTreeMap<DriverId, DriverRecord<P>>,
    riders: HashMap<RiderId, RiderEntry<P>>,
    pending: VecDeque<PendingRequest>,
    clock: u64,
}

impl<P: Locatable> Default for DispatchScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Locatable> DispatchScheduler<P> {
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
            riders: HashMap::new(),
            pending: VecDeque::new(),
            clock: 0,
        }
    }

    /// Registers drivers. A known driver only gets the new location and keeps
    /// its dispatch state. New available drivers serve the queue right away;
    /// returns the matches made.
    pub fn load_drivers(
        &mut self,
        drivers: impl IntoIterator<Item = DriverRecord<P>>,
    ) -> Vec<Match> {
        let mut added_capacity = false;
        for driver in drivers {
            match self.drivers.get_mut(&driver.id) {
                Some(existing) => existing.location = driver.location,
                None => {
                    added_capacity |= driver.state == DriverState::Available;
                    self.drivers.insert(driver.id, driver);
                }
            }
        }
        info!("Drivers loaded: {}", self.drivers.len());

        if added_capacity {
            self.drain_pending()
        } else {
            Vec::new()
        }
    }

    /// Registers riders. Existing riders keep their dispatch state and get the new location.
    pub fn load_riders(&mut self, riders: impl IntoIterator<Item = RiderRecord<P>>) {
        for rider in riders {
            self.riders
                .entry(rider.id)
                .and_modify(|entry| entry.record.location = rider.location)
                .or_insert(RiderEntry {
                    record: rider,
                    state: RiderState::Idle,
                });
        }
        info!("Riders loaded: {}", self.riders.len());
    }

    pub fn driver(&self, id: DriverId) -> DispatchResult<&DriverRecord<P>> {
        self.drivers.get(&id).ok_or(DispatchError::UnknownDriver(id))
    }

    pub fn rider(&self, id: RiderId) -> DispatchResult<&RiderRecord<P>> {
        self.riders
            .get(&id)
            .map(|entry| &entry.record)
            .ok_or(DispatchError::UnknownRider(id))
    }

    pub fn rider_state(&self, id: RiderId) -> DispatchResult<RiderState> {
        self.riders
            .get(&id)
            .map(|entry| entry.state)
            .ok_or(DispatchError::UnknownRider(id))
    }

    pub fn update_driver_location(&mut self, id: DriverId, location: P) -> DispatchResult<()> {
        let driver = self
            .drivers
            .get_mut(&id)
            .ok_or(DispatchError::UnknownDriver(id))?;
        driver.location = location;
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending riders, longest waiting first
    pub fn pending_riders(&self) -> Vec<RiderId> {
        self.pending.iter().map(|request| request.rider).collect()
    }

    pub fn available_drivers(&self) -> Vec<DriverId> {
        self.drivers
            .values()
            .filter(|d| d.state == DriverState::Available)
            .map(|d| d.id)
            .collect()
    }

    /// Driver currently assigned to a rider, if any
    pub fn assignment(&self, rider: RiderId) -> Option<DriverId> {
        match self.riders.get(&rider)?.state {
            RiderState::Assigned(driver) => Some(driver),
            _ => None,
        }
    }

    /// Matches the rider to the nearest available driver, or queues the rider.
    ///
    /// Re-requesting while queued is a no-op and keeps the rider's place in line.
    pub fn request_ride(&mut self, rider: RiderId) -> DispatchResult<RideOutcome> {
        let entry = self
            .riders
            .get(&rider)
            .ok_or(DispatchError::UnknownRider(rider))?;

        match entry.state {
            RiderState::Pending => {
                debug!("{} is already queued", rider);
                return Ok(RideOutcome::Queued);
            }
            RiderState::Assigned(driver) => return Ok(RideOutcome::AlreadyAssigned(driver)),
            RiderState::Idle | RiderState::Completed => {}
        }

        let location = entry.record.location;
        info!("{} requesting a ride at {:?}", rider, location);

        match self.assign_nearest(rider, location) {
            Some(matched) => Ok(RideOutcome::Matched(matched)),
            None => {
                self.enqueue(rider);
                Ok(RideOutcome::Queued)
            }
        }
    }

    /// Returns a driver to service and serves waiting riders.
    /// Returns the matches made while draining the queue.
    ///
    /// A rider still holding the driver loses it and goes back to idle; use
    /// `complete_ride` or `cancel_ride` first to close the ride explicitly.
    pub fn mark_driver_available(&mut self, driver: DriverId) -> DispatchResult<Vec<Match>> {
        let record = self
            .drivers
            .get_mut(&driver)
            .ok_or(DispatchError::UnknownDriver(driver))?;

        if record.state == DriverState::Assigned {
            for entry in self.riders.values_mut() {
                if entry.state == RiderState::Assigned(driver) {
                    warn!("{} released while {} still held it", driver, entry.record.id);
                    entry.state = RiderState::Idle;
                }
            }
        }
        record.state = DriverState::Available;
        info!("{} is now available", driver);

        Ok(self.drain_pending())
    }

    /// Serves queued riders in arrival order, one match per available driver.
    /// Stops as soon as no driver is left; the rest stay queued.
    pub fn process_pending_requests(&mut self) -> DispatchResult<Vec<Match>> {
        Ok(self.drain_pending())
    }

    /// Marks an assigned ride as finished. The driver stays assigned until
    /// `mark_driver_available` is called for it.
    pub fn complete_ride(&mut self, rider: RiderId) -> DispatchResult<DriverId> {
        let entry = self
            .riders
            .get_mut(&rider)
            .ok_or(DispatchError::UnknownRider(rider))?;
        match entry.state {
            RiderState::Assigned(driver) => {
                entry.state = RiderState::Completed;
                info!("Ride for {} completed by {}", rider, driver);
                Ok(driver)
            }
            _ => Err(DispatchError::NotAssigned(rider)),
        }
    }

    /// Withdraws a rider's request. A queued rider leaves the queue; an assigned
    /// rider frees its driver, which immediately serves the queue.
    pub fn cancel_ride(&mut self, rider: RiderId) -> DispatchResult<Vec<Match>> {
        let entry = self
            .riders
            .get_mut(&rider)
            .ok_or(DispatchError::UnknownRider(rider))?;

        match entry.state {
            RiderState::Pending => {
                entry.state = RiderState::Idle;
                self.pending.retain(|request| request.rider != rider);
                info!("{} left the queue", rider);
                Ok(Vec::new())
            }
            RiderState::Assigned(driver) => {
                entry.state = RiderState::Idle;
                info!("{} cancelled, releasing {}", rider, driver);
                self.mark_driver_available(driver)
            }
            RiderState::Idle | RiderState::Completed => Ok(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> DispatchSnapshot<P> {
        let mut assignments: Vec<(RiderId, DriverId)> = self
            .riders
            .values()
            .filter_map(|entry| match entry.state {
                RiderState::Assigned(driver) => Some((entry.record.id, driver)),
                _ => None,
            })
            .collect();
        assignments.sort();

        DispatchSnapshot {
            drivers: self.drivers.values().cloned().collect(),
            pending: self.pending.iter().copied().collect(),
            assignments,
        }
    }

    fn enqueue(&mut self, rider: RiderId) {
        if let Some(entry) = self.riders.get_mut(&rider) {
            entry.state = RiderState::Pending;
        }
        self.clock += 1;
        self.pending.push_back(PendingRequest {
            rider,
            requested_at: self.clock,
        });
        info!(
            "No available drivers. {} added to the queue (position {})",
            rider,
            self.pending.len()
        );
    }

    fn drain_pending(&mut self) -> Vec<Match> {
        let mut matches = Vec::new();

        while let Some(request) = self.pending.front().copied() {
            let Some(location) = self.riders.get(&request.rider).map(|e| e.record.location) else {
                warn!("Dropping queued request for unknown {}", request.rider);
                self.pending.pop_front();
                continue;
            };
            match self.assign_nearest(request.rider, location) {
                Some(matched) => {
                    self.pending.pop_front();
                    debug!(
                        "{} matched after waiting since t={}",
                        request.rider, request.requested_at
                    );
                    matches.push(matched);
                }
                None => break,
            }
        }

        if self.pending.is_empty() {
            debug!("No pending requests left");
        } else {
            info!(
                "{} request(s) still pending, waiting for drivers",
                self.pending.len()
            );
        }

        matches
    }

    /// Picks the nearest available driver for the rider and assigns it.
    /// Ties go to the lowest driver id.
    fn assign_nearest(&mut self, rider: RiderId, rider_location: P) -> Option<Match> {
        let by_distance: BTreeSet<(OrderedFloat<f64>, DriverId)> = self
            .drivers
            .values()
            .filter(|d| d.state == DriverState::Available)
            .map(|d| {
                let distance = rider_location.distance_to(&d.location);
                debug!("Distance from {} to {}: {:.3}", rider, d.id, distance);
                (OrderedFloat(distance), d.id)
            })
            .collect();

        let (distance, driver) = by_distance.first().copied()?;

        if let Some(record) = self.drivers.get_mut(&driver) {
            record.state = DriverState::Assigned;
        }
        if let Some(entry) = self.riders.get_mut(&rider) {
            entry.state = RiderState::Assigned(driver);
        }

        info!(
            "{} assigned to {} (distance {:.3})",
            driver,
            rider,
            distance.into_inner()
        );

        Some(Match {
            rider,
            driver,
            distance: distance.into_inner(),
        })
    }
}
