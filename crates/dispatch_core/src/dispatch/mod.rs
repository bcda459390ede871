//! Dispatch engine: four strategies for matching pending orders to
//! couriers, sharing an eligibility/marginal-cost bookkeeping core.
//!
//! Per the design notes, this is a tagged enum rather than the teacher's
//! `Box<dyn MatchingAlgorithm>` trait object — there is no runtime registry
//! of user-supplied algorithms here, only four fixed, named strategies.

mod adaptive;
mod baseline;
mod combinatorial;
mod sequential;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::geo::GeoDist;
use crate::model::{Courier, CourierStatus, Order, OrderStatus};
use crate::time::SimTime;
use crate::tsp::{self, TspCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Baseline,
    Sequential,
    Combinatorial,
    Adaptive,
}

impl Strategy {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "baseline" => Some(Self::Baseline),
            "sequential" => Some(Self::Sequential),
            "combinatorial" => Some(Self::Combinatorial),
            "adaptive" => Some(Self::Adaptive),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Sequential => "sequential",
            Self::Combinatorial => "combinatorial",
            Self::Adaptive => "adaptive",
        }
    }
}

/// Everything a strategy implementation needs, bundled so the four
/// strategy modules share one call shape.
pub struct DispatchArgs<'a> {
    pub couriers: &'a mut [Courier],
    pub orders: &'a mut HashMap<String, Order>,
    pub pending: &'a mut Vec<String>,
    pub current_time: SimTime,
    pub config: &'a Config,
    pub geo: &'a dyn GeoDist,
    pub cache: &'a mut TspCache,
    /// Creation times of orders injected within the adaptive rate window;
    /// only consulted by `Strategy::Adaptive`.
    pub recent_order_times: &'a [SimTime],
}

/// Dispatches `args.pending` against `args.couriers` under `strategy`.
/// Returns the distance (km) added to the fleet this call: full
/// pickup-to-dropoff length for baseline, marginal distance for the other
/// three (see the design notes' preserved asymmetry).
pub fn dispatch(strategy: Strategy, mut args: DispatchArgs<'_>) -> f64 {
    args.cache.clear();
    match strategy {
        Strategy::Baseline => baseline::run(&mut args),
        Strategy::Sequential => sequential::run(&mut args),
        Strategy::Combinatorial => combinatorial::run(&mut args),
        Strategy::Adaptive => adaptive::run(&mut args),
    }
}

/// A courier currently open to new assignments, with its existing route
/// distance `E` (0.0 if idle) used as the marginal-cost baseline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Eligible {
    pub index: usize,
    pub existing_distance_km: f64,
}

pub(crate) fn eligible_set(
    couriers: &[Courier],
    orders: &HashMap<String, Order>,
    current_time: SimTime,
    geo: &dyn GeoDist,
    cache: &mut TspCache,
) -> Vec<Eligible> {
    couriers
        .iter()
        .enumerate()
        .filter_map(|(index, courier)| match courier.status {
            CourierStatus::Delivering => None,
            CourierStatus::Idle => (courier.available_from <= current_time).then_some(Eligible {
                index,
                existing_distance_km: 0.0,
            }),
            CourierStatus::Accruing => (courier.assigned_orders.len() < courier.capacity).then(|| Eligible {
                index,
                existing_distance_km: existing_route_distance(courier, orders, geo, cache),
            }),
        })
        .collect()
}

/// The ids of a courier's assigned orders whose pickup has already happened
/// (only their dropoff remains in the route).
pub(crate) fn already_picked_up<'c>(courier: &'c Courier) -> Vec<&'c str> {
    courier
        .assigned_orders
        .iter()
        .filter(|id| {
            !courier
                .remaining_stops()
                .iter()
                .any(|s| s.kind == crate::model::StopKind::Pickup && &s.order_id == *id)
        })
        .map(String::as_str)
        .collect()
}

pub(crate) fn existing_route_distance(
    courier: &Courier,
    orders: &HashMap<String, Order>,
    geo: &dyn GeoDist,
    cache: &mut TspCache,
) -> f64 {
    if courier.assigned_orders.is_empty() {
        return 0.0;
    }
    let active: Vec<&Order> = courier
        .assigned_orders
        .iter()
        .map(|id| orders.get(id).expect("assigned order exists in order table"))
        .collect();
    let picked_up = already_picked_up(courier);
    let (_, distance) = tsp::solve(courier.current_location, &active, &picked_up, geo, cache);
    distance
}

/// Replans `courier`'s route over its current assigned orders plus
/// `extra_order_ids`, returning the full route and total distance. Used by
/// both the per-order bid evaluation and the final commit (same call,
/// different cache state, so results agree).
pub(crate) fn replan_with_extra(
    courier: &Courier,
    orders: &HashMap<String, Order>,
    extra_order_ids: &[&str],
    geo: &dyn GeoDist,
    cache: &mut TspCache,
) -> (Vec<crate::model::Stop>, f64, Vec<String>) {
    let mut assigned: Vec<String> = courier.assigned_orders.clone();
    for id in extra_order_ids {
        assigned.push((*id).to_string());
    }
    let active: Vec<&Order> = assigned
        .iter()
        .map(|id| orders.get(id).expect("order exists in order table"))
        .collect();
    let picked_up = already_picked_up(courier);
    let (route, distance) = tsp::solve(courier.current_location, &active, &picked_up, geo, cache);
    (route, distance, assigned)
}

/// Commits a newly-planned route to `courier`, marks each of its orders
/// Assigned (if not already), and arms the ETA to the route's first stop.
pub(crate) fn commit_assignment(
    courier: &mut Courier,
    orders: &mut HashMap<String, Order>,
    assigned_order_ids: Vec<String>,
    route: Vec<crate::model::Stop>,
    total_distance_km: f64,
    current_time: SimTime,
    config: &Config,
    geo: &dyn GeoDist,
) {
    for id in &assigned_order_ids {
        if let Some(order) = orders.get_mut(id) {
            if order.status == OrderStatus::Pending {
                order.transition(OrderStatus::Assigned);
            }
        }
    }
    let first_leg = route.first().map(|stop| {
        let travel = geo.travel_time_min(courier.current_location, stop.location, config.avg_speed_kmh);
        current_time + travel + config.service_time_mins
    });
    courier.commit_route(assigned_order_ids, route, total_distance_km);
    courier.eta_next_stop = first_leg;
}

/// Finds the nearest eligible IDLE courier to `pickup`, if any.
pub(crate) fn nearest_idle<'e>(
    eligible: &'e [Eligible],
    couriers: &[Courier],
    pickup: crate::model::Location,
    geo: &dyn GeoDist,
) -> Option<&'e Eligible> {
    eligible
        .iter()
        .filter(|e| couriers[e.index].status == CourierStatus::Idle)
        .min_by(|a, b| {
            let da = geo.distance_km(couriers[a.index].current_location, pickup);
            let db = geo.distance_km(couriers[b.index].current_location, pickup);
            da.partial_cmp(&db).unwrap()
        })
}
