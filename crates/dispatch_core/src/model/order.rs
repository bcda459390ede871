//! Delivery order: a pickup-to-dropoff request with a lifecycle.

use serde::{Deserialize, Serialize};

use crate::model::stop::Location;
use crate::time::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub pickup: Location,
    pub dropoff: Location,
    pub created_time: SimTime,
    pub estimated_delivery_time_min: i64,
    pub status: OrderStatus,
    pub pickup_time: Option<SimTime>,
    pub dropoff_time: Option<SimTime>,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        pickup: Location,
        dropoff: Location,
        created_time: SimTime,
        estimated_delivery_time_min: i64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            pickup,
            dropoff,
            created_time,
            estimated_delivery_time_min,
            status: OrderStatus::Pending,
            pickup_time: None,
            dropoff_time: None,
        }
    }

    pub fn deadline(&self) -> SimTime {
        self.created_time + self.estimated_delivery_time_min
    }

    /// Advances the order's lifecycle state. Panics if the transition is
    /// not monotone — this would indicate a dispatch engine bug, not a
    /// recoverable condition, so it is an invariant check rather than an
    /// `Err` return.
    pub fn transition(&mut self, to: OrderStatus) {
        use OrderStatus::*;
        let legal = matches!(
            (self.status, to),
            (Pending, Assigned)
                | (Assigned, PickedUp)
                | (PickedUp, Delivered)
                | (Pending, Failed)
                | (Assigned, Failed)
        );
        assert!(legal, "illegal order transition {:?} -> {:?}", self.status, to);
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_adds_estimate_to_created_time() {
        let o = Order::new("o1", (0.0, 0.0), (1.0, 1.0), SimTime::from_minutes(100), 30);
        assert_eq!(o.deadline().minutes(), 130);
    }

    #[test]
    #[should_panic]
    fn rejects_backwards_transition() {
        let mut o = Order::new("o1", (0.0, 0.0), (1.0, 1.0), SimTime::from_minutes(0), 30);
        o.transition(OrderStatus::Assigned);
        o.transition(OrderStatus::Pending);
    }
}
