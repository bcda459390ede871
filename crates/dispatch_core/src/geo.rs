//! Distance and travel-time abstraction: great-circle by default, an
//! optional road-network façade behind the `road-distance` feature.
//!
//! Grounded on `dpapukchiev-ride-hailing-simulation`'s `spatial.rs`
//! (Haversine + `LruCache` pattern, adapted from `h3o::LatLng` cells to raw
//! coordinate pairs) and `routing.rs` (`RouteProvider` trait,
//! `CachedRouteProvider`, blocking-HTTP table precompute with a bounded
//! timeout and Haversine fallback on failure).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::model::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;

fn round5(x: f64) -> i64 {
    (x * 100_000.0).round() as i64
}

fn cache_key(a: Location, b: Location) -> (i64, i64, i64, i64) {
    let a = (round5(a.0), round5(a.1));
    let b = (round5(b.0), round5(b.1));
    if a <= b {
        (a.0, a.1, b.0, b.1)
    } else {
        (b.0, b.1, a.0, a.1)
    }
}

pub fn haversine_km(a: Location, b: Location) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance and travel-time source. Two implementations: pure great-circle
/// and an optional road-network façade. Upper layers (TSP oracle, cost
/// function, dispatch engine) are oblivious to which is active.
pub trait GeoDist: Send + Sync {
    fn distance_km(&self, a: Location, b: Location) -> f64;

    fn travel_time_min(&self, a: Location, b: Location, avg_speed_kmh: f64) -> f64 {
        self.distance_km(a, b) / avg_speed_kmh * 60.0
    }
}

/// Pure Haversine great-circle distance, LRU-cached by rounded coordinate
/// pair (symmetric lookup).
pub struct Haversine {
    cache: Mutex<LruCache<(i64, i64, i64, i64), f64>>,
}

impl Haversine {
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache_size.max(1)).expect("cache size must be non-zero"),
            )),
        }
    }
}

impl GeoDist for Haversine {
    fn distance_km(&self, a: Location, b: Location) -> f64 {
        let key = cache_key(a, b);
        let mut cache = self.cache.lock().unwrap();
        *cache.get_or_insert(key, || haversine_km(a, b))
    }
}

/// Great-circle distance multiplied by a constant detour factor, used both
/// as the road-network fallback and as the `travel_time` estimator whenever
/// no live road distance is available.
pub struct HaversineMultiplier {
    inner: Haversine,
    multiplier: f64,
}

impl HaversineMultiplier {
    pub fn new(cache_size: usize, multiplier: f64) -> Self {
        Self {
            inner: Haversine::new(cache_size),
            multiplier,
        }
    }
}

impl GeoDist for HaversineMultiplier {
    fn distance_km(&self, a: Location, b: Location) -> f64 {
        self.inner.distance_km(a, b) * self.multiplier
    }
}

#[cfg(feature = "road-distance")]
pub mod road {
    use std::collections::HashMap;
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use lru::LruCache;
    use serde::Deserialize;

    use super::{cache_key, GeoDist, HaversineMultiplier};
    use crate::model::Location;

    #[derive(Debug, Deserialize)]
    struct TableResponse {
        distances: Option<Vec<Vec<f64>>>,
        durations: Option<Vec<Vec<f64>>>,
    }

    /// Queries an external OSRM-style routing service: a `/table` endpoint
    /// for bulk precompute, falling back to Haversine × multiplier on
    /// failure, timeout, or an oversized location set.
    pub struct RoadNetwork {
        client: reqwest::blocking::Client,
        endpoint: String,
        fallback: HaversineMultiplier,
        max_table_locations: usize,
        cache: Mutex<LruCache<(i64, i64, i64, i64), (f64, f64)>>,
    }

    impl RoadNetwork {
        pub fn new(
            endpoint: impl Into<String>,
            timeout_secs: u64,
            cache_size: usize,
            max_table_locations: usize,
            fallback_multiplier: f64,
        ) -> Self {
            Self {
                client: reqwest::blocking::Client::builder()
                    .timeout(Duration::from_secs(timeout_secs))
                    .build()
                    .expect("http client builds"),
                endpoint: endpoint.into(),
                fallback: HaversineMultiplier::new(cache_size, fallback_multiplier),
                max_table_locations,
                cache: Mutex::new(LruCache::new(
                    NonZeroUsize::new(cache_size.max(1)).expect("cache size must be non-zero"),
                )),
            }
        }

        fn query(&self, a: Location, b: Location) -> Option<(f64, f64)> {
            let url = format!(
                "{}/route/v1/driving/{},{};{},{}?overview=false",
                self.endpoint, a.1, a.0, b.1, b.0
            );
            let resp = self.client.get(&url).send().ok()?;
            if !resp.status().is_success() {
                return None;
            }
            #[derive(Deserialize)]
            struct Route {
                distance: f64,
                duration: f64,
            }
            #[derive(Deserialize)]
            struct RouteResponse {
                routes: Option<Vec<Route>>,
            }
            let parsed: RouteResponse = resp.json().ok()?;
            let route = parsed.routes?.into_iter().next()?;
            Some((route.distance / 1000.0, route.duration / 60.0))
        }

        /// Bulk precompute via the table API, for ≤ `max_table_locations`
        /// locations. Returns `None` (caller falls back) on failure, timeout,
        /// or an oversized request.
        pub fn precompute_table(&self, locations: &[Location]) -> Option<HashMap<(i64, i64, i64, i64), (f64, f64)>> {
            if locations.len() > self.max_table_locations {
                tracing::warn!(
                    count = locations.len(),
                    limit = self.max_table_locations,
                    "skipping road-network table precompute: too many locations"
                );
                return None;
            }
            let coords: Vec<String> = locations.iter().map(|l| format!("{},{}", l.1, l.0)).collect();
            let url = format!("{}/table/v1/driving/{}?annotations=distance,duration", self.endpoint, coords.join(";"));
            let resp = match self.client.get(&url).send() {
                Ok(r) if r.status().is_success() => r,
                _ => {
                    tracing::warn!("road-network table request failed, falling back to haversine");
                    return None;
                }
            };
            let table: TableResponse = match resp.json() {
                Ok(t) => t,
                Err(_) => {
                    tracing::warn!("road-network table response unparsable, falling back to haversine");
                    return None;
                }
            };
            let (distances, durations) = match (table.distances, table.durations) {
                (Some(d), Some(t)) => (d, t),
                _ => return None,
            };
            let mut out = HashMap::new();
            for (i, a) in locations.iter().enumerate() {
                for (j, b) in locations.iter().enumerate() {
                    if let (Some(d_row), Some(t_row)) = (distances.get(i), durations.get(i)) {
                        if let (Some(d), Some(t)) = (d_row.get(j), t_row.get(j)) {
                            out.insert(cache_key(*a, *b), (d / 1000.0, t / 60.0));
                        }
                    }
                }
            }
            Some(out)
        }
    }

    impl RoadNetwork {
        /// Returns `(distance_km, duration_min)`, cached and falling back to
        /// Haversine × multiplier on any query failure.
        fn distance_and_duration(&self, a: Location, b: Location) -> (f64, f64) {
            let key = cache_key(a, b);
            let mut cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.get(&key) {
                return *cached;
            }
            let result = self.query(a, b).unwrap_or_else(|| {
                tracing::warn!("road-network query failed, falling back to haversine");
                (self.fallback.distance_km(a, b), 0.0)
            });
            cache.put(key, result);
            result
        }
    }

    impl GeoDist for RoadNetwork {
        fn distance_km(&self, a: Location, b: Location) -> f64 {
            self.distance_and_duration(a, b).0
        }

        fn travel_time_min(&self, a: Location, b: Location, avg_speed_kmh: f64) -> f64 {
            let (distance_km, duration_min) = self.distance_and_duration(a, b);
            if duration_min > 0.0 {
                duration_min
            } else {
                distance_km / avg_speed_kmh * 60.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(haversine_km((25.0, 51.0), (25.0, 51.0)), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = (25.2854, 51.5310);
        let b = (25.2900, 51.5350);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn cache_key_is_order_independent() {
        let a = (25.28541, 51.53102);
        let b = (25.29001, 51.53498);
        assert_eq!(cache_key(a, b), cache_key(b, a));
    }

    #[test]
    fn haversine_cache_returns_same_value() {
        let geo = Haversine::new(100);
        let a = (25.2854, 51.5310);
        let b = (25.2900, 51.5350);
        let d1 = geo.distance_km(a, b);
        let d2 = geo.distance_km(a, b);
        assert_eq!(d1, d2);
    }

    #[test]
    fn multiplier_scales_distance() {
        let a = (25.2854, 51.5310);
        let b = (25.2900, 51.5350);
        let base = Haversine::new(10).distance_km(a, b);
        let scaled = HaversineMultiplier::new(10, 1.4).distance_km(a, b);
        assert!((scaled - base * 1.4).abs() < 1e-9);
    }
}
