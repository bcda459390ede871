//! Sequential: per-order bidding with dynamic re-planning.

use crate::cost::calculate_trip_cost;
use crate::model::{Bundle, Courier, CourierStatus, Stop};

use super::{commit_assignment, eligible_set, nearest_idle, replan_with_extra, DispatchArgs, Eligible};

pub fn run(args: &mut DispatchArgs<'_>) -> f64 {
    let mut eligible = eligible_set(args.couriers, args.orders, args.current_time, args.geo, args.cache);
    let mut distance_added = 0.0;
    let mut assigned_ids = Vec::new();

    for order_id in args.pending.clone() {
        let mut best: Option<(usize, f64, Vec<Stop>, f64, Vec<String>)> = None;

        for e in &eligible {
            let courier = &args.couriers[e.index];
            let (route, total_distance, assigned) =
                replan_with_extra(courier, args.orders, &[order_id.as_str()], args.geo, args.cache);
            let bundle = Bundle {
                orders: assigned
                    .iter()
                    .map(|id| args.orders.get(id).expect("order exists"))
                    .collect(),
                route: route.clone(),
                total_distance_km: total_distance,
            };
            let cost = calculate_trip_cost(
                args.config,
                courier,
                &bundle,
                args.current_time,
                e.existing_distance_km,
                args.geo,
            );
            if cost.is_finite() && best.as_ref().map(|b| cost < b.1).unwrap_or(true) {
                best = Some((e.index, cost, route, total_distance, assigned));
            }
        }

        if let Some((idx, _, route, total_distance, assigned)) = best {
            commit_assignment(&mut args.couriers[idx], args.orders, assigned, route, total_distance, args.current_time, args.config, args.geo);
            let prev_e = eligible.iter().find(|e| e.index == idx).unwrap().existing_distance_km;
            distance_added += total_distance - prev_e;
            update_eligibility(&mut eligible, &args.couriers[idx], idx, total_distance);
            assigned_ids.push(order_id);
            continue;
        }

        // Fallback: every bid was +inf (or there were no eligible couriers at
        // all). Assign to the nearest IDLE courier regardless of cost —
        // better late than undelivered.
        let pickup = match args.orders.get(&order_id) {
            Some(o) => o.pickup,
            None => continue,
        };
        if let Some(idle) = nearest_idle(&eligible, args.couriers, pickup, args.geo) {
            let idx = idle.index;
            let (route, total_distance, assigned) =
                replan_with_extra(&args.couriers[idx], args.orders, &[order_id.as_str()], args.geo, args.cache);
            commit_assignment(&mut args.couriers[idx], args.orders, assigned, route, total_distance, args.current_time, args.config, args.geo);
            distance_added += total_distance;
            update_eligibility(&mut eligible, &args.couriers[idx], idx, total_distance);
            assigned_ids.push(order_id);
        }
    }

    args.pending.retain(|id| !assigned_ids.contains(id));
    distance_added
}

fn update_eligibility(eligible: &mut Vec<Eligible>, courier: &Courier, idx: usize, new_distance: f64) {
    if courier.status == CourierStatus::Delivering || courier.assigned_orders.len() >= courier.capacity {
        eligible.retain(|e| e.index != idx);
    } else if let Some(e) = eligible.iter_mut().find(|e| e.index == idx) {
        e.existing_distance_km = new_distance;
    }
}
