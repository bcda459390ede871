//! Travelling-Salesperson-with-Precedence-Constraints oracle.
//!
//! Held-Karp dynamic programming over bitmasks: `dp[mask][last]` is the
//! minimum distance to visit exactly the stops in `mask`, ending at `last`.
//! A dropoff stop may only enter `mask` once its pickup (if not already
//! picked up) is already present. Complexity is `O(n^2 * 2^n)`, acceptable
//! because per-courier stop counts are bounded by `capacity` and
//! `max_bundle_size`.
//!
//! The cache is owned by the dispatch call that constructs it and must be
//! cleared at the start of each such call (couriers move between calls).

use std::collections::HashMap;

use crate::geo::GeoDist;
use crate::model::{Location, Order, Stop, StopKind};

/// Keyed by (rounded start location, sorted active order ids, sorted
/// already-picked-up order ids), per the design notes.
pub type TspCacheKey = (i64, i64, Vec<String>, Vec<String>);

#[derive(Default)]
pub struct TspCache {
    entries: HashMap<TspCacheKey, (Vec<Stop>, f64)>,
}

impl TspCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn round5(x: f64) -> i64 {
    (x * 100_000.0).round() as i64
}

fn cache_key(start: Location, active: &[&Order], picked_up: &[&str]) -> TspCacheKey {
    let mut active_ids: Vec<String> = active.iter().map(|o| o.order_id.clone()).collect();
    active_ids.sort();
    let mut picked_ids: Vec<String> = picked_up.iter().map(|s| s.to_string()).collect();
    picked_ids.sort();
    (round5(start.0), round5(start.1), active_ids, picked_ids)
}

/// Solves TSP-PC for a courier at `start`, holding `active` orders, of
/// which the ids in `picked_up` have already been collected (their pickup
/// stop is omitted from the route). Returns the optimal ordered stop
/// sequence and its total distance. Empty `active` returns `(vec![], 0.0)`.
pub fn solve(
    start: Location,
    active: &[&Order],
    picked_up: &[&str],
    geo: &dyn GeoDist,
    cache: &mut TspCache,
) -> (Vec<Stop>, f64) {
    if active.is_empty() {
        return (Vec::new(), 0.0);
    }

    let key = cache_key(start, active, picked_up);
    if let Some(cached) = cache.entries.get(&key) {
        return cached.clone();
    }

    let result = solve_uncached(start, active, picked_up, geo);
    cache.entries.insert(key, result.clone());
    result
}

fn solve_uncached(start: Location, active: &[&Order], picked_up: &[&str], geo: &dyn GeoDist) -> (Vec<Stop>, f64) {
    // Build the stop list: pickup (if not already collected) then dropoff, per order.
    struct StopInfo {
        stop: Stop,
        prerequisite: Option<usize>,
    }

    let mut stops: Vec<StopInfo> = Vec::with_capacity(active.len() * 2);
    for order in active {
        let already_picked_up = picked_up.contains(&order.order_id.as_str());
        let pickup_index = if already_picked_up {
            None
        } else {
            stops.push(StopInfo {
                stop: Stop::pickup(order.pickup, &order.order_id),
                prerequisite: None,
            });
            Some(stops.len() - 1)
        };
        stops.push(StopInfo {
            stop: Stop::dropoff(order.dropoff, &order.order_id),
            prerequisite: pickup_index,
        });
    }

    let n = stops.len();
    let locations: Vec<Location> = stops.iter().map(|s| s.stop.location).collect();
    let dist_from_start: Vec<f64> = locations.iter().map(|&l| geo.distance_km(start, l)).collect();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                dist[i][j] = geo.distance_km(locations[i], locations[j]);
            }
        }
    }

    const NO_PARENT: usize = usize::MAX;
    let full = 1usize << n;
    let mut dp = vec![vec![f64::INFINITY; n]; full];
    let mut parent = vec![vec![NO_PARENT; n]; full];

    for i in 0..n {
        if stops[i].prerequisite.is_none() {
            let mask = 1usize << i;
            dp[mask][i] = dist_from_start[i];
        }
    }

    for mask in 1..full {
        for last in 0..n {
            if mask & (1 << last) == 0 || !dp[mask][last].is_finite() {
                continue;
            }
            let current_cost = dp[mask][last];
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                if let Some(prereq) = stops[next].prerequisite {
                    if mask & (1 << prereq) == 0 {
                        continue;
                    }
                }
                let next_mask = mask | (1 << next);
                let candidate = current_cost + dist[last][next];
                if candidate < dp[next_mask][next] {
                    dp[next_mask][next] = candidate;
                    parent[next_mask][next] = last;
                }
            }
        }
    }

    let full_mask = full - 1;
    let mut best_last = 0;
    let mut best_cost = f64::INFINITY;
    for last in 0..n {
        if dp[full_mask][last] < best_cost {
            best_cost = dp[full_mask][last];
            best_last = last;
        }
    }

    debug_assert!(best_cost.is_finite(), "precedence-respecting route must exist for any well-formed order set");

    let mut order_of_visit = Vec::with_capacity(n);
    let mut mask = full_mask;
    let mut last = best_last;
    loop {
        order_of_visit.push(last);
        let prev = parent[mask][last];
        mask &= !(1 << last);
        if prev == NO_PARENT {
            break;
        }
        last = prev;
    }
    order_of_visit.reverse();

    let route = order_of_visit.into_iter().map(|i| stops[i].stop.clone()).collect();
    (route, best_cost)
}

/// Verifies the pickup-before-dropoff precedence invariant for every order
/// not already marked picked up, used both internally and by tests.
pub fn respects_precedence(route: &[Stop], picked_up: &[&str]) -> bool {
    let mut seen_pickup: HashMap<&str, usize> = HashMap::new();
    for (idx, stop) in route.iter().enumerate() {
        if stop.kind == StopKind::Pickup {
            seen_pickup.insert(&stop.order_id, idx);
        }
    }
    for stop in route {
        if stop.kind == StopKind::Dropoff && !picked_up.contains(&stop.order_id.as_str()) {
            if !seen_pickup.contains_key(stop.order_id.as_str()) {
                return false;
            }
        }
    }
    let mut dropped: Vec<&str> = Vec::new();
    for stop in route {
        match stop.kind {
            StopKind::Pickup => {
                if dropped.contains(&stop.order_id.as_str()) {
                    return false;
                }
            }
            StopKind::Dropoff => dropped.push(&stop.order_id),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Haversine;
    use crate::time::SimTime;

    fn order(id: &str, pickup: Location, dropoff: Location) -> Order {
        Order::new(id, pickup, dropoff, SimTime::from_minutes(0), 30)
    }

    #[test]
    fn empty_active_returns_empty_route() {
        let geo = Haversine::new(100);
        let mut cache = TspCache::new();
        let (route, dist) = solve((0.0, 0.0), &[], &[], &geo, &mut cache);
        assert!(route.is_empty());
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn single_order_route_is_pickup_then_dropoff() {
        let geo = Haversine::new(100);
        let mut cache = TspCache::new();
        let o = order("o1", (25.28, 51.53), (25.29, 51.54));
        let (route, _) = solve((25.28, 51.53), &[&o], &[], &geo, &mut cache);
        assert_eq!(route.len(), 2);
        assert_eq!(route[0].kind, StopKind::Pickup);
        assert_eq!(route[1].kind, StopKind::Dropoff);
        assert!(respects_precedence(&route, &[]));
    }

    #[test]
    fn already_picked_up_order_skips_pickup_stop() {
        let geo = Haversine::new(100);
        let mut cache = TspCache::new();
        let o = order("o1", (25.28, 51.53), (25.29, 51.54));
        let (route, _) = solve((25.29, 51.54), &[&o], &["o1"], &geo, &mut cache);
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].kind, StopKind::Dropoff);
    }

    /// Brute-force precedence-respecting permutation search, for
    /// cross-checking Held-Karp optimality on small inputs.
    fn brute_force(start: Location, active: &[&Order], picked_up: &[&str], geo: &dyn GeoDist) -> f64 {
        struct StopInfo {
            stop: Stop,
            prerequisite: Option<usize>,
        }
        let mut stops = Vec::new();
        for order in active {
            let already = picked_up.contains(&order.order_id.as_str());
            let pickup_index = if already {
                None
            } else {
                stops.push(StopInfo { stop: Stop::pickup(order.pickup, &order.order_id), prerequisite: None });
                Some(stops.len() - 1)
            };
            stops.push(StopInfo { stop: Stop::dropoff(order.dropoff, &order.order_id), prerequisite: pickup_index });
        }
        let n = stops.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut best = f64::INFINITY;
        permute(&mut indices, 0, &mut |perm: &[usize]| {
            let mut position = [0usize; 16];
            for (pos, &i) in perm.iter().enumerate() {
                position[i] = pos;
            }
            for (i, info) in stops.iter().enumerate() {
                if let Some(prereq) = info.prerequisite {
                    if position[prereq] > position[i] {
                        return;
                    }
                }
            }
            let mut total = geo.distance_km(start, stops[perm[0]].stop.location);
            for w in perm.windows(2) {
                total += geo.distance_km(stops[w[0]].stop.location, stops[w[1]].stop.location);
            }
            if total < best {
                best = total;
            }
        });
        best
    }

    fn permute(arr: &mut [usize], k: usize, visit: &mut impl FnMut(&[usize])) {
        if k == arr.len() {
            visit(arr);
            return;
        }
        for i in k..arr.len() {
            arr.swap(k, i);
            permute(arr, k + 1, visit);
            arr.swap(k, i);
        }
    }

    #[test]
    fn matches_brute_force_on_small_bundles() {
        let geo = Haversine::new(1000);
        let orders = vec![
            order("o1", (25.28, 51.53), (25.30, 51.55)),
            order("o2", (25.27, 51.52), (25.29, 51.54)),
            order("o3", (25.26, 51.50), (25.31, 51.56)),
        ];
        let refs: Vec<&Order> = orders.iter().collect();
        let start = (25.25, 51.50);

        let mut cache = TspCache::new();
        let (route, dist) = solve(start, &refs, &[], &geo, &mut cache);
        let brute = brute_force(start, &refs, &[], &geo);

        assert!((dist - brute).abs() < 1e-6, "held-karp={dist} brute={brute}");
        assert!(respects_precedence(&route, &[]));
    }

    #[test]
    fn matches_brute_force_with_one_already_picked_up() {
        let geo = Haversine::new(1000);
        let orders = vec![
            order("o1", (25.28, 51.53), (25.30, 51.55)),
            order("o2", (25.27, 51.52), (25.29, 51.54)),
        ];
        let refs: Vec<&Order> = orders.iter().collect();
        let start = (25.27, 51.52);
        let picked_up = ["o2"];

        let mut cache = TspCache::new();
        let (route, dist) = solve(start, &refs, &picked_up, &geo, &mut cache);
        let brute = brute_force(start, &refs, &picked_up, &geo);

        assert!((dist - brute).abs() < 1e-6);
        assert!(respects_precedence(&route, &picked_up));
    }

    #[test]
    fn cache_hits_return_identical_result() {
        let geo = Haversine::new(1000);
        let orders = vec![order("o1", (25.28, 51.53), (25.30, 51.55))];
        let refs: Vec<&Order> = orders.iter().collect();
        let mut cache = TspCache::new();
        let (_, d1) = solve((25.0, 51.0), &refs, &[], &geo, &mut cache);
        let (_, d2) = solve((25.0, 51.0), &refs, &[], &geo, &mut cache);
        assert_eq!(d1, d2);
    }
}
