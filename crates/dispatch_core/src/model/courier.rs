//! Courier (driver) state machine.

use serde::{Deserialize, Serialize};

use crate::model::stop::{Location, Stop, StopKind};
use crate::time::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Motorbike,
    Bike,
    Car,
}

impl VehicleType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "motorbike" => Some(Self::Motorbike),
            "bike" => Some(Self::Bike),
            "car" => Some(Self::Car),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourierStatus {
    Idle,
    Accruing,
    Delivering,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub driver_id: String,
    pub start_location: Location,
    pub vehicle_type: VehicleType,
    pub capacity: usize,
    pub available_from: SimTime,

    pub current_location: Location,
    pub status: CourierStatus,
    pub assigned_orders: Vec<String>,
    pub route: Vec<Stop>,
    pub next_stop_index: usize,
    pub eta_next_stop: Option<SimTime>,

    /// Total distance of the courier's current committed route, km. Serves
    /// as the marginal-cost baseline `E` for subsequent bids in the same
    /// dispatch call.
    pub route_distance_km: f64,
}

impl Courier {
    pub fn new(
        driver_id: impl Into<String>,
        start_location: Location,
        vehicle_type: VehicleType,
        capacity: usize,
        available_from: SimTime,
    ) -> Self {
        Self {
            driver_id: driver_id.into(),
            start_location,
            vehicle_type,
            capacity,
            available_from,
            current_location: start_location,
            status: CourierStatus::Idle,
            assigned_orders: Vec::new(),
            route: Vec::new(),
            next_stop_index: 0,
            eta_next_stop: None,
            route_distance_km: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.route.is_empty()
    }

    pub fn remaining_stops(&self) -> &[Stop] {
        &self.route[self.next_stop_index..]
    }

    /// Recomputes `status` from the remaining route contents, per the
    /// state-route agreement invariant: IDLE iff empty route, DELIVERING
    /// iff all remaining stops are dropoffs, ACCRUING iff at least one
    /// remaining stop is a pickup.
    pub fn resync_status(&mut self) {
        let remaining = self.remaining_stops();
        self.status = if remaining.is_empty() {
            CourierStatus::Idle
        } else if remaining.iter().any(|s| s.kind == StopKind::Pickup) {
            CourierStatus::Accruing
        } else {
            CourierStatus::Delivering
        };
    }

    pub fn has_capacity_for(&self, additional_orders: usize) -> bool {
        self.assigned_orders.len() + additional_orders <= self.capacity
    }

    /// Installs a newly-planned route (replacing any previous one),
    /// updating state to match.
    pub fn commit_route(&mut self, assigned_orders: Vec<String>, route: Vec<Stop>, route_distance_km: f64) {
        self.assigned_orders = assigned_orders;
        self.route = route;
        self.next_stop_index = 0;
        self.route_distance_km = route_distance_km;
        self.resync_status();
    }

    pub fn clear_route(&mut self) {
        self.assigned_orders.clear();
        self.route.clear();
        self.next_stop_index = 0;
        self.route_distance_km = 0.0;
        self.eta_next_stop = None;
        self.status = CourierStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier() -> Courier {
        Courier::new("d1", (0.0, 0.0), VehicleType::Bike, 2, SimTime::from_minutes(0))
    }

    #[test]
    fn new_courier_is_idle() {
        let c = courier();
        assert_eq!(c.status, CourierStatus::Idle);
        assert!(c.is_idle());
    }

    #[test]
    fn resync_detects_accruing_vs_delivering() {
        let mut c = courier();
        c.route = vec![Stop::pickup((0.0, 0.0), "o1"), Stop::dropoff((1.0, 1.0), "o1")];
        c.resync_status();
        assert_eq!(c.status, CourierStatus::Accruing);

        c.next_stop_index = 1;
        c.resync_status();
        assert_eq!(c.status, CourierStatus::Delivering);

        c.next_stop_index = 2;
        c.resync_status();
        assert_eq!(c.status, CourierStatus::Idle);
    }

    #[test]
    fn vehicle_type_parses_case_insensitively() {
        assert_eq!(VehicleType::parse("Motorbike"), Some(VehicleType::Motorbike));
        assert_eq!(VehicleType::parse("scooter"), None);
    }
}
