//! Candidate assignment: a set of orders plus a planned route.

use crate::model::order::Order;
use crate::model::stop::Stop;

#[derive(Debug, Clone)]
pub struct Bundle<'a> {
    pub orders: Vec<&'a Order>,
    pub route: Vec<Stop>,
    pub total_distance_km: f64,
}

impl<'a> Bundle<'a> {
    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn order_ids(&self) -> Vec<&str> {
        self.orders.iter().map(|o| o.order_id.as_str()).collect()
    }
}
