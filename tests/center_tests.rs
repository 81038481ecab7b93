//! Concurrent dispatch tests

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use ride_dispatch::simulation::{
    CancelToken, Cell, City, DispatchCenter, DispatchError, DriverId, DriverState, GridWorld,
    RideOutcome, RiderId, RiderState, RouteGraph, SimDriver, TripOutcome, GRID_RIDER,
};

fn center_with_drivers(cells: &[Cell]) -> DispatchCenter {
    let mut world = GridWorld::new(20);
    for (index, cell) in cells.iter().enumerate() {
        world
            .add_driver(SimDriver::new(DriverId(index), "Driver", "Alto", 100, *cell))
            .unwrap();
    }
    DispatchCenter::new(City::from_parts(world, RouteGraph::demo_city().unwrap()))
}

#[test]
fn test_concurrent_requests_never_double_book() {
    let center = center_with_drivers(&[Cell::new(0, 0), Cell::new(5, 5), Cell::new(10, 10)]);
    center.with_city(|city| {
        for id in 1..=12 {
            city.add_rider(RiderId(id), Cell::new(id, 19 - id)).unwrap();
        }
    });

    let handles: Vec<_> = (1..=12)
        .map(|id| {
            let center = center.clone();
            thread::spawn(move || center.request_ride(RiderId(id)).unwrap())
        })
        .collect();

    let mut matched = HashSet::new();
    let mut queued = 0;
    for handle in handles {
        match handle.join().unwrap() {
            RideOutcome::Matched(m) => assert!(matched.insert(m.driver), "{} matched twice", m.driver),
            RideOutcome::Queued => queued += 1,
            RideOutcome::AlreadyAssigned(_) => panic!("fresh riders cannot be assigned"),
        }
    }

    assert_eq!(matched.len(), 3);
    assert_eq!(queued, 9);
    let snapshot = center.snapshot();
    assert_eq!(snapshot.available_count(), 0);
    assert_eq!(snapshot.pending.len(), 9);
    assert_eq!(snapshot.assignments.len(), 3);
}

#[test]
fn test_spawned_trip_arrives() {
    let center = center_with_drivers(&[Cell::new(19, 10)]);
    let driver = match center.request_ride(GRID_RIDER).unwrap() {
        RideOutcome::Matched(m) => m.driver,
        other => panic!("expected a match, got {:?}", other),
    };

    let handle = center.spawn_trip(GRID_RIDER, driver, Duration::ZERO, CancelToken::new());
    let outcome = handle.join().unwrap().unwrap();

    assert_eq!(outcome, TripOutcome::Arrived { steps: 9 });
    center.with_city(|city| {
        assert_eq!(city.grid.driver(driver).unwrap().cell, Cell::new(19, 19));
        assert_eq!(city.scheduler.rider_state(GRID_RIDER).unwrap(), RiderState::Completed);
    });
}

#[test]
fn test_cancelled_trip_releases_driver() {
    let center = center_with_drivers(&[Cell::new(0, 0)]);
    center.with_city(|city| city.add_rider(RiderId(2), Cell::new(1, 0)).unwrap());

    assert!(matches!(
        center.request_ride(GRID_RIDER).unwrap(),
        RideOutcome::Matched(_)
    ));
    assert_eq!(center.request_ride(RiderId(2)).unwrap(), RideOutcome::Queued);

    let cancel = CancelToken::new();
    let handle = center.spawn_trip(
        GRID_RIDER,
        DriverId(0),
        Duration::from_millis(20),
        cancel.clone(),
    );
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();

    let result = handle.join().unwrap();
    assert_eq!(result, Err(DispatchError::Cancelled(DriverId(0))));

    // The freed driver went straight to the waiting rider
    center.with_city(|city| {
        assert_eq!(city.scheduler.rider_state(GRID_RIDER).unwrap(), RiderState::Idle);
        assert_eq!(city.scheduler.assignment(RiderId(2)), Some(DriverId(0)));
        assert_eq!(
            city.scheduler.driver(DriverId(0)).unwrap().state,
            DriverState::Assigned
        );
    });
}

#[test]
fn test_cancel_with_nobody_waiting_leaves_driver_available() {
    let center = center_with_drivers(&[Cell::new(0, 0)]);
    center.request_ride(GRID_RIDER).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = center
        .spawn_trip(GRID_RIDER, DriverId(0), Duration::ZERO, cancel)
        .join()
        .unwrap();

    assert_eq!(result, Err(DispatchError::Cancelled(DriverId(0))));
    let snapshot = center.snapshot();
    assert_eq!(snapshot.available_count(), 1);
    assert!(snapshot.assignments.is_empty());
}

#[test]
fn test_mark_available_through_center_drains_queue() {
    let center = center_with_drivers(&[Cell::new(0, 0)]);
    center.with_city(|city| {
        city.add_rider(RiderId(1), Cell::new(4, 4)).unwrap();
        city.add_rider(RiderId(2), Cell::new(8, 8)).unwrap();
    });

    center.request_ride(RiderId(1)).unwrap();
    center.request_ride(RiderId(2)).unwrap();
    assert_eq!(center.cancel_ride(RiderId(1)).unwrap().len(), 1);

    let snapshot = center.snapshot();
    assert_eq!(snapshot.assignments, vec![(RiderId(2), DriverId(0))]);
    assert!(center.mark_driver_available(DriverId(0)).unwrap().is_empty());
    assert_eq!(center.snapshot().available_count(), 1);
}

#[test]
fn test_cancelling_ride_stops_running_trip() {
    let center = center_with_drivers(&[Cell::new(0, 0)]);
    center.with_city(|city| city.add_rider(RiderId(2), Cell::new(0, 1)).unwrap());
    center.request_ride(GRID_RIDER).unwrap();
    assert_eq!(center.request_ride(RiderId(2)).unwrap(), RideOutcome::Queued);

    let handle = center.spawn_trip(
        GRID_RIDER,
        DriverId(0),
        Duration::from_millis(10),
        CancelToken::new(),
    );
    thread::sleep(Duration::from_millis(35));

    let matches = center.cancel_ride(GRID_RIDER).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].rider, RiderId(2));
    assert_eq!(matches[0].driver, DriverId(0));
    let cell_at_cancel = center.with_city(|city| city.grid.driver(DriverId(0)).unwrap().cell);

    assert_eq!(
        handle.join().unwrap(),
        Err(DispatchError::Cancelled(DriverId(0)))
    );

    // The trip took no step for a rider that no longer holds the driver
    center.with_city(|city| {
        let driver = city.grid.driver(DriverId(0)).unwrap();
        assert_eq!(driver.cell, cell_at_cancel);
        assert_ne!(driver.cell, Cell::new(19, 19));
        assert_eq!(city.scheduler.rider_state(GRID_RIDER).unwrap(), RiderState::Idle);
        assert_eq!(
            city.scheduler.rider_state(RiderId(2)).unwrap(),
            RiderState::Assigned(DriverId(0))
        );
    });
}

#[test]
fn test_trip_for_unassigned_pair_never_moves_driver() {
    let center = center_with_drivers(&[Cell::new(0, 0)]);

    let result = center
        .spawn_trip(GRID_RIDER, DriverId(0), Duration::ZERO, CancelToken::new())
        .join()
        .unwrap();

    assert_eq!(result, Err(DispatchError::Cancelled(DriverId(0))));
    center.with_city(|city| {
        assert_eq!(city.grid.driver(DriverId(0)).unwrap().cell, Cell::new(0, 0));
        assert_eq!(city.scheduler.available_drivers(), vec![DriverId(0)]);
        assert_eq!(city.scheduler.rider_state(GRID_RIDER).unwrap(), RiderState::Idle);
    });
}
