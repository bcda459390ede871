//! Recursive spatial max-cut bundle generator.
//!
//! Produces a deduplicated set of candidate order bundles (size
//! `1..=max_bundle_size`) in `O(n log n)` rather than enumerating every
//! `n choose k` subset: a greedy 0.5-approximate max-cut bipartitions the
//! pending orders recursively, emitting every intermediate group that fits
//! the size cap, plus forced close pairs and all singletons for coverage.

use std::collections::HashSet;

use crate::geo::GeoDist;
use crate::model::Order;

const MAX_RECURSION_DEPTH: u32 = 5;

/// A candidate bundle: the indices (into the caller's pending-order slice)
/// of the orders it contains.
#[derive(Debug, Clone)]
pub struct CandidateBundle {
    pub order_indices: Vec<usize>,
}

pub fn generate<'a>(
    orders: &[&'a Order],
    max_bundle_size: usize,
    max_pickup_distance_km: f64,
    geo: &dyn GeoDist,
) -> Vec<CandidateBundle> {
    let n = orders.len();
    if n == 0 {
        return Vec::new();
    }

    let mut pickup_dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = geo.distance_km(orders[i].pickup, orders[j].pickup);
            pickup_dist[i][j] = d;
            pickup_dist[j][i] = d;
        }
    }

    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut out: Vec<CandidateBundle> = Vec::new();

    let all_indices: Vec<usize> = (0..n).collect();
    recurse(&all_indices, &pickup_dist, max_bundle_size, 0, &mut seen, &mut out);

    for i in 0..n {
        for j in (i + 1)..n {
            if pickup_dist[i][j] <= max_pickup_distance_km {
                push_unique(&mut seen, &mut out, vec![i, j]);
            }
        }
    }

    for i in 0..n {
        push_unique(&mut seen, &mut out, vec![i]);
    }

    out
}

fn recurse(
    indices: &[usize],
    pickup_dist: &[Vec<f64>],
    max_bundle_size: usize,
    depth: u32,
    seen: &mut HashSet<Vec<usize>>,
    out: &mut Vec<CandidateBundle>,
) {
    if indices.len() <= max_bundle_size {
        push_unique(seen, out, indices.to_vec());
        return;
    }
    if depth >= MAX_RECURSION_DEPTH {
        return;
    }

    let (group_a, group_b) = greedy_max_cut(indices, pickup_dist);
    if group_a.is_empty() || group_b.is_empty() {
        // Degenerate split (all distances tied at 0): stop recursing to avoid
        // looping forever on an unsplittable group.
        return;
    }

    push_unique(seen, out, group_a.clone());
    push_unique(seen, out, group_b.clone());

    recurse(&group_a, pickup_dist, max_bundle_size, depth + 1, seen, out);
    recurse(&group_b, pickup_dist, max_bundle_size, depth + 1, seen, out);
}

/// Greedy 0.5-approximate max-cut: each order joins whichever group its
/// cumulative pickup distance to is *larger*, which keeps spatially close
/// orders in the other group together.
fn greedy_max_cut(indices: &[usize], pickup_dist: &[Vec<f64>]) -> (Vec<usize>, Vec<usize>) {
    let mut group_a: Vec<usize> = Vec::new();
    let mut group_b: Vec<usize> = Vec::new();

    for &idx in indices {
        let dist_to_a: f64 = group_a.iter().map(|&g| pickup_dist[idx][g]).sum();
        let dist_to_b: f64 = group_b.iter().map(|&g| pickup_dist[idx][g]).sum();
        if dist_to_a > dist_to_b {
            group_a.push(idx);
        } else {
            group_b.push(idx);
        }
    }

    (group_a, group_b)
}

fn push_unique(seen: &mut HashSet<Vec<usize>>, out: &mut Vec<CandidateBundle>, mut indices: Vec<usize>) {
    indices.sort_unstable();
    if seen.insert(indices.clone()) {
        out.push(CandidateBundle { order_indices: indices });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Haversine;
    use crate::time::SimTime;

    fn order(id: &str, pickup: (f64, f64)) -> Order {
        Order::new(id, pickup, pickup, SimTime::from_minutes(0), 30)
    }

    #[test]
    fn every_bundle_within_size_cap() {
        let orders: Vec<Order> = (0..6)
            .map(|i| order(&format!("o{i}"), (25.0 + i as f64 * 0.001, 51.0)))
            .collect();
        let refs: Vec<&Order> = orders.iter().collect();
        let geo = Haversine::new(1000);
        let bundles = generate(&refs, 2, 5.0, &geo);
        assert!(bundles.iter().all(|b| !b.order_indices.is_empty() && b.order_indices.len() <= 2));
    }

    #[test]
    fn every_singleton_present() {
        let orders: Vec<Order> = (0..4)
            .map(|i| order(&format!("o{i}"), (25.0 + i as f64 * 0.01, 51.0)))
            .collect();
        let refs: Vec<&Order> = orders.iter().collect();
        let geo = Haversine::new(1000);
        let bundles = generate(&refs, 2, 5.0, &geo);
        for i in 0..4 {
            assert!(bundles.iter().any(|b| b.order_indices == vec![i]));
        }
    }

    #[test]
    fn close_pairs_are_forced_in() {
        // Two orders 0 apart (same pickup point) must appear as a pair.
        let orders = vec![order("o0", (25.0, 51.0)), order("o1", (25.0, 51.0)), order("o2", (26.0, 52.0))];
        let refs: Vec<&Order> = orders.iter().collect();
        let geo = Haversine::new(1000);
        let bundles = generate(&refs, 2, 5.0, &geo);
        assert!(bundles.iter().any(|b| b.order_indices == vec![0, 1]));
    }

    #[test]
    fn no_duplicate_bundles() {
        let orders: Vec<Order> = (0..8)
            .map(|i| order(&format!("o{i}"), (25.0 + i as f64 * 0.002, 51.0)))
            .collect();
        let refs: Vec<&Order> = orders.iter().collect();
        let geo = Haversine::new(1000);
        let bundles = generate(&refs, 2, 5.0, &geo);
        let mut seen = HashSet::new();
        for b in &bundles {
            let mut key = b.order_indices.clone();
            key.sort_unstable();
            assert!(seen.insert(key), "duplicate bundle {:?}", b.order_indices);
        }
    }
}
