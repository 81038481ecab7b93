//! Thread-safe front door to a `City`
//!
//! All scheduler decisions happen while holding the one city lock, so a
//! driver can never be matched twice. Trips run on their own threads and
//! take the lock only to advance a single step. A trip stops as soon as its
//! rider no longer holds the driver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;

use super::city::City;
use super::error::{DispatchError, DispatchResult};
use super::scheduler::{DispatchSnapshot, Match, RideOutcome};
use super::trip::{CancelToken, TripOutcome, TripStep};
use super::types::{Cell, DriverId, RiderId};

#[derive(Clone)]
pub struct DispatchCenter {
    city: Arc<Mutex<City>>,
    /// Cancel flags of running trips, by rider. Lock order: city, then trips.
    trips: Arc<Mutex<HashMap<RiderId, CancelToken>>>,
}

impl DispatchCenter {
    pub fn new(city: City) -> Self {
        Self {
            city: Arc::new(Mutex::new(city)),
            trips: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, City> {
        // A panicked trip thread must not take the whole dispatch down
        self.city.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_trips(&self) -> MutexGuard<'_, HashMap<RiderId, CancelToken>> {
        self.trips.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the city
    pub fn with_city<T>(&self, f: impl FnOnce(&mut City) -> T) -> T {
        f(&mut *self.lock())
    }

    pub fn request_ride(&self, rider: RiderId) -> DispatchResult<RideOutcome> {
        self.lock().request_ride(rider)
    }

    pub fn mark_driver_available(&self, driver: DriverId) -> DispatchResult<Vec<Match>> {
        self.lock().mark_driver_available(driver)
    }

    /// Withdraws the rider's request and stops its trip, if one is running.
    /// The trip thread sees the flag before it can take another step.
    pub fn cancel_ride(&self, rider: RiderId) -> DispatchResult<Vec<Match>> {
        let mut city = self.lock();
        let matches = city.scheduler.cancel_ride(rider)?;
        if let Some(token) = self.active_trips().remove(&rider) {
            token.cancel();
        }
        Ok(matches)
    }

    pub fn snapshot(&self) -> DispatchSnapshot<Cell> {
        self.lock().snapshot()
    }

    /// Drives `driver` to `rider` on a background thread.
    ///
    /// Cancelling the token stops the trip before its next step and releases
    /// the driver back to available.
    pub fn spawn_trip(
        &self,
        rider: RiderId,
        driver: DriverId,
        tick: Duration,
        cancel: CancelToken,
    ) -> JoinHandle<DispatchResult<TripOutcome>> {
        if let Some(previous) = self.active_trips().insert(rider, cancel.clone()) {
            previous.cancel();
        }
        let center = self.clone();
        thread::spawn(move || {
            let result = center.drive(rider, driver, tick, &cancel);
            let settled = center.lock().settle_trip(rider, driver, result);

            let mut trips = center.active_trips();
            if trips.get(&rider).is_some_and(|token| token.shares_flag(&cancel)) {
                trips.remove(&rider);
            }
            settled
        })
    }

    fn drive(
        &self,
        rider: RiderId,
        driver: DriverId,
        tick: Duration,
        cancel: &CancelToken,
    ) -> DispatchResult<TripOutcome> {
        let mut trip = self.lock().plan_trip(rider, driver)?;
        info!(
            "{} en route to {} ({} step(s))",
            driver,
            rider,
            trip.remaining()
        );

        loop {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled(driver));
            }

            {
                let mut city = self.lock();
                if !city.holds_assignment(rider, driver) {
                    info!("{} no longer serves {}, stopping", driver, rider);
                    return Err(DispatchError::Cancelled(driver));
                }
                match city.step_trip(&mut trip)? {
                    TripStep::Moved(_) => {}
                    terminal => return trip.finish(&city.grid, terminal),
                }
            }

            if !tick.is_zero() {
                thread::sleep(tick);
            }
        }
    }
}
