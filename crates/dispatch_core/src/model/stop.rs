//! A single stop in a courier's route.

use serde::{Deserialize, Serialize};

pub type Location = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopKind {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub location: Location,
    pub kind: StopKind,
    pub order_id: String,
}

impl Stop {
    pub fn pickup(location: Location, order_id: impl Into<String>) -> Self {
        Self {
            location,
            kind: StopKind::Pickup,
            order_id: order_id.into(),
        }
    }

    pub fn dropoff(location: Location, order_id: impl Into<String>) -> Self {
        Self {
            location,
            kind: StopKind::Dropoff,
            order_id: order_id.into(),
        }
    }
}
