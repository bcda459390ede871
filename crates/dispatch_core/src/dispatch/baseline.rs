//! Baseline: greedy-nearest-IDLE, one order per courier, no bundling.

use super::{commit_assignment, eligible_set, nearest_idle, replan_with_extra, DispatchArgs};
use crate::model::CourierStatus;

pub fn run(args: &mut DispatchArgs<'_>) -> f64 {
    let mut eligible: Vec<_> = eligible_set(args.couriers, args.orders, args.current_time, args.geo, args.cache)
        .into_iter()
        .filter(|e| args.couriers[e.index].status == CourierStatus::Idle)
        .collect();

    let mut distance_added = 0.0;
    let mut assigned_ids = Vec::new();

    for order_id in args.pending.clone() {
        if eligible.is_empty() {
            break;
        }
        let pickup = match args.orders.get(&order_id) {
            Some(o) => o.pickup,
            None => continue,
        };
        let chosen = nearest_idle(&eligible, args.couriers, pickup, args.geo).map(|e| e.index);
        let Some(idx) = chosen else { break };

        let (route, distance, assigned) =
            replan_with_extra(&args.couriers[idx], args.orders, &[order_id.as_str()], args.geo, args.cache);
        commit_assignment(&mut args.couriers[idx], args.orders, assigned, route, distance, args.current_time, args.config, args.geo);
        distance_added += distance;
        eligible.retain(|e| e.index != idx);
        assigned_ids.push(order_id);
    }

    args.pending.retain(|id| !assigned_ids.contains(id));
    distance_added
}
