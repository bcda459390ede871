//! Marginal-cost bidding/scoring function.
//!
//! Grounded on `original_source/src/scoring.py`'s `calculate_trip_cost`:
//! capacity check, a temporal walk of the candidate route accumulating
//! travel time and per-stop service time, a hard SLA cutoff per dropoff,
//! a capped delay accumulator, marginal-distance pricing against the
//! courier's existing route, a vehicle-type penalty, per-order
//! normalisation and a bundle discount — applied in that exact order.

use crate::config::Config;
use crate::geo::GeoDist;
use crate::model::{Bundle, Courier, StopKind};
use crate::time::SimTime;

const MAX_DELAY_CAP_MINS: f64 = 20.0;

/// Scores `bundle` for `courier`, given the courier's existing route
/// distance `existing_route_distance_km` (0.0 if idle). Returns `+inf` for
/// any infeasible bid (over capacity or an SLA violation) — bids never
/// propagate an error, per the error-handling design.
pub fn calculate_trip_cost(
    config: &Config,
    courier: &Courier,
    bundle: &Bundle,
    current_time: SimTime,
    existing_route_distance_km: f64,
    geo: &dyn GeoDist,
) -> f64 {
    if bundle.num_orders() == 0 {
        return f64::INFINITY;
    }
    if bundle.num_orders() > courier.capacity {
        return f64::INFINITY;
    }

    let mut location = courier.current_location;
    let mut elapsed_mins = 0.0_f64;
    let mut total_delay = 0.0;

    for stop in &bundle.route {
        let travel_min = geo.travel_time_min(location, stop.location, config.avg_speed_kmh);
        elapsed_mins += travel_min + config.service_time_mins;
        location = stop.location;

        if stop.kind == StopKind::Dropoff {
            let order = bundle
                .orders
                .iter()
                .find(|o| o.order_id == stop.order_id)
                .expect("bundle route references one of its own orders");

            let actual_duration = (current_time - order.created_time) as f64 + elapsed_mins;
            if actual_duration > config.max_delivery_time_mins {
                return f64::INFINITY;
            }

            let delay = (actual_duration - order.estimated_delivery_time_min as f64).max(0.0);
            total_delay += delay.min(MAX_DELAY_CAP_MINS);
        }
    }

    let marginal_distance = bundle.total_distance_km - existing_route_distance_km;
    let base_score = config.w_distance * marginal_distance + config.w_delay * total_delay;
    let penalized = base_score * config.vehicle_penalty(courier.vehicle_type);
    let per_order = penalized / bundle.num_orders() as f64;
    let discount = 1.0 - config.bundle_discount_per_order * (bundle.num_orders() as f64 - 1.0);

    per_order * discount
}
