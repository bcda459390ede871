//! Combinatorial: batched bundle bidding over the spatial max-cut generator.

use rayon::prelude::*;

use crate::bundles::{self, CandidateBundle};
use crate::cost::calculate_trip_cost;
use crate::model::{Bundle, Courier, CourierStatus, Order, Stop};
use crate::tsp::TspCache;

use super::{commit_assignment, eligible_set, nearest_idle, replan_with_extra, DispatchArgs, Eligible};

struct Candidate {
    courier_idx: usize,
    order_ids: Vec<String>,
    route: Vec<Stop>,
    total_distance_km: f64,
    cost: f64,
}

pub fn run(args: &mut DispatchArgs<'_>) -> f64 {
    let mut eligible = eligible_set(args.couriers, args.orders, args.current_time, args.geo, args.cache);
    let mut distance_added = 0.0;

    loop {
        if eligible.is_empty() || args.pending.is_empty() {
            break;
        }

        let pending_orders: Vec<&Order> = args
            .pending
            .iter()
            .filter_map(|id| args.orders.get(id))
            .collect();
        let bundles = bundles::generate(
            &pending_orders,
            args.config.max_bundle_size,
            args.config.max_pickup_distance_km,
            args.geo,
        );

        let best = evaluate_pairs(&bundles, &pending_orders, &eligible, args);

        match best {
            Some(candidate) => {
                let mut all = courier_assigned_snapshot(&args.couriers[candidate.courier_idx], &candidate.order_ids);
                all.sort();
                all.dedup();
                commit_assignment(
                    &mut args.couriers[candidate.courier_idx],
                    args.orders,
                    all,
                    candidate.route,
                    candidate.total_distance_km,
                    args.current_time,
                    args.config,
                    args.geo,
                );
                let prev_e = eligible
                    .iter()
                    .find(|e| e.index == candidate.courier_idx)
                    .unwrap()
                    .existing_distance_km;
                distance_added += candidate.total_distance_km - prev_e;

                args.pending.retain(|id| !candidate.order_ids.contains(id));
                update_eligibility(&mut eligible, &args.couriers[candidate.courier_idx], candidate.courier_idx, candidate.total_distance_km);
            }
            None => {
                let placed = run_fallback(args, &mut eligible, &mut distance_added);
                if placed == 0 {
                    break;
                }
            }
        }
    }

    distance_added
}

fn courier_assigned_snapshot(courier: &Courier, extra: &[String]) -> Vec<String> {
    let mut all = courier.assigned_orders.clone();
    all.extend(extra.iter().cloned());
    all
}

fn evaluate_pairs(
    bundles: &[CandidateBundle],
    pending_orders: &[&Order],
    eligible: &[Eligible],
    args: &DispatchArgs<'_>,
) -> Option<Candidate> {
    // Snapshot each (bundle, courier) pair's feasibility check and TSP
    // replan/cost calculation; the TSP cache is per-thread to keep this
    // sound under `par_iter`, matching the "may parallelise bidding
    // evaluation" allowance — each pair observes a consistent snapshot of
    // courier state taken at loop entry.
    let pairs: Vec<(usize, &CandidateBundle)> = eligible
        .iter()
        .flat_map(|e| bundles.iter().map(move |b| (e.index, b)))
        .filter(|(courier_idx, bundle)| {
            args.couriers[*courier_idx].assigned_orders.len() + bundle.order_indices.len()
                <= args.couriers[*courier_idx].capacity
        })
        .collect();

    let mut evaluated: Vec<Candidate> = pairs
        .par_iter()
        .filter_map(|(courier_idx, bundle)| {
            let mut local_cache = TspCache::new();
            let courier = &args.couriers[*courier_idx];
            let order_ids: Vec<&str> = bundle.order_indices.iter().map(|&i| pending_orders[i].order_id.as_str()).collect();
            let (route, total_distance, assigned) =
                replan_with_extra(courier, args.orders, &order_ids, args.geo, &mut local_cache);
            let bundle_view = Bundle {
                orders: assigned.iter().map(|id| args.orders.get(id).expect("order exists")).collect(),
                route: route.clone(),
                total_distance_km: total_distance,
            };
            let e = eligible.iter().find(|e| e.index == *courier_idx)?;
            let cost = calculate_trip_cost(args.config, courier, &bundle_view, args.current_time, e.existing_distance_km, args.geo);
            if !cost.is_finite() {
                return None;
            }
            Some(Candidate {
                courier_idx: *courier_idx,
                order_ids: order_ids.into_iter().map(str::to_string).collect(),
                route,
                total_distance_km: total_distance,
                cost,
            })
        })
        .collect();

    if evaluated.is_empty() {
        return None;
    }

    // Smallest cost; ties broken by larger bundle size, then by a stable
    // signature of the order ids, per the deterministic-ordering rule.
    evaluated.sort_by(|a, b| {
        a.cost
            .partial_cmp(&b.cost)
            .unwrap()
            .then_with(|| b.order_ids.len().cmp(&a.order_ids.len()))
            .then_with(|| signature(&a.order_ids).cmp(&signature(&b.order_ids)))
    });
    Some(evaluated.remove(0))
}

fn signature(order_ids: &[String]) -> String {
    let mut sorted = order_ids.to_vec();
    sorted.sort();
    sorted.join(",")
}

fn update_eligibility(eligible: &mut Vec<Eligible>, courier: &Courier, idx: usize, new_distance: f64) {
    if courier.status == CourierStatus::Delivering || courier.assigned_orders.len() >= courier.capacity {
        eligible.retain(|e| e.index != idx);
    } else if let Some(e) = eligible.iter_mut().find(|e| e.index == idx) {
        e.existing_distance_km = new_distance;
    }
}

/// When no feasible (cost-finite) pair exists: try to place each
/// still-pending order on (a) the nearest IDLE courier via a simple
/// pickup-to-dropoff route, then (b) the nearest ACCRUING courier with
/// spare capacity by re-planning. Returns the number of orders placed.
fn run_fallback(args: &mut DispatchArgs<'_>, eligible: &mut Vec<Eligible>, distance_added: &mut f64) -> usize {
    let mut placed = 0;
    let mut assigned_ids = Vec::new();

    for order_id in args.pending.clone() {
        let pickup = match args.orders.get(&order_id) {
            Some(o) => o.pickup,
            None => continue,
        };

        if let Some(idle) = nearest_idle(eligible, args.couriers, pickup, args.geo) {
            let idx = idle.index;
            let (route, total_distance, assigned) =
                replan_with_extra(&args.couriers[idx], args.orders, &[order_id.as_str()], args.geo, args.cache);
            commit_assignment(&mut args.couriers[idx], args.orders, assigned, route, total_distance, args.current_time, args.config, args.geo);
            *distance_added += total_distance;
            update_eligibility(eligible, &args.couriers[idx], idx, total_distance);
            assigned_ids.push(order_id);
            placed += 1;
            continue;
        }

        if let Some(idx) = nearest_accruing_with_capacity(eligible, args.couriers, pickup, args.geo) {
            let prev_e = eligible.iter().find(|e| e.index == idx).unwrap().existing_distance_km;
            let (route, total_distance, assigned) =
                replan_with_extra(&args.couriers[idx], args.orders, &[order_id.as_str()], args.geo, args.cache);
            commit_assignment(&mut args.couriers[idx], args.orders, assigned, route, total_distance, args.current_time, args.config, args.geo);
            *distance_added += total_distance - prev_e;
            update_eligibility(eligible, &args.couriers[idx], idx, total_distance);
            assigned_ids.push(order_id);
            placed += 1;
        }
    }

    args.pending.retain(|id| !assigned_ids.contains(id));
    placed
}

fn nearest_accruing_with_capacity(
    eligible: &[Eligible],
    couriers: &[Courier],
    pickup: crate::model::Location,
    geo: &dyn crate::geo::GeoDist,
) -> Option<usize> {
    eligible
        .iter()
        .filter(|e| {
            let c = &couriers[e.index];
            c.status == CourierStatus::Accruing && c.assigned_orders.len() < c.capacity
        })
        .min_by(|a, b| {
            let da = geo.distance_km(couriers[a.index].current_location, pickup);
            let db = geo.distance_km(couriers[b.index].current_location, pickup);
            da.partial_cmp(&db).unwrap()
        })
        .map(|e| e.index)
}
