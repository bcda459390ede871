//! Tunable configuration surface, per the external interface contract.
//!
//! Mirrors the documentation style of
//! `dpapukchiev-ride-hailing-simulation`'s `scenario/params.rs` config
//! resources: one field per tunable, a `Default` impl carrying the
//! documented defaults, field-level doc comments. Unlike the teacher, these
//! are plain fields on one struct rather than one `bevy_ecs::Resource` per
//! setting — there is no ECS scheduler here to hang resources off of.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::VehicleType;
use crate::time::SimTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tick loop lower bound, minutes since midnight. Default 17:00:00.
    pub start_time: SimTime,
    /// Tick loop upper bound, minutes since midnight. Default 22:00:00.
    pub simulation_end_time: SimTime,
    /// Simulated minutes advanced per tick.
    pub simulation_speed_minutes: i64,
    /// Fallback travel speed used to convert distance to time, km/h.
    pub avg_speed_kmh: f64,
    /// Dwell time added per stop visited, minutes.
    pub service_time_mins: f64,
    /// Adaptive strategy: orders/min rate at or above which combinatorial is used.
    pub high_load_threshold: f64,
    /// Adaptive strategy: rolling window over which order rate is measured, minutes.
    pub combinatorial_window_mins: f64,
    /// Cost function weight on marginal distance.
    pub w_distance: f64,
    /// Cost function weight on accumulated delay.
    pub w_delay: f64,
    /// Discount applied per extra order in a bundle, as a fraction.
    pub bundle_discount_per_order: f64,
    pub penalty_motorbike: f64,
    pub penalty_bike: f64,
    pub penalty_car: f64,
    /// Upper bound on orders per bundle/courier capacity used by the bundle generator.
    pub max_bundle_size: usize,
    /// Pickup-to-pickup distance under which a pair is always emitted as a size-2 bundle, km.
    pub max_pickup_distance_km: f64,
    /// Hard SLA cutoff on a single order's end-to-end duration, minutes.
    pub max_delivery_time_mins: f64,
    /// Minimum time a batch accrues pending orders before combinatorial/adaptive dispatch, minutes.
    pub batch_window_mins: f64,
    /// Selects the GeoDist backend: road-network façade vs. great-circle.
    pub use_road_distance: bool,
    /// Detour multiplier applied to Haversine distance when acting as a fallback/estimate.
    pub haversine_fallback_multiplier: f64,
    /// Bound on the GeoDist cache, entries.
    pub geo_cache_size: usize,
    /// Bound on locations accepted by the bulk table-precompute path.
    pub road_table_max_locations: usize,
    /// Timeout applied to the road-network façade, seconds.
    pub road_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_time: SimTime::from_minutes(17 * 60),
            simulation_end_time: SimTime::from_minutes(22 * 60),
            simulation_speed_minutes: 1,
            avg_speed_kmh: 35.0,
            service_time_mins: 5.0,
            high_load_threshold: 2.0,
            combinatorial_window_mins: 5.0,
            w_distance: 1.0,
            w_delay: 1.5,
            bundle_discount_per_order: 0.25,
            penalty_motorbike: 1.0,
            penalty_bike: 1.2,
            penalty_car: 1.4,
            max_bundle_size: 2,
            max_pickup_distance_km: 5.0,
            max_delivery_time_mins: 52.0,
            batch_window_mins: 1.0,
            use_road_distance: false,
            haversine_fallback_multiplier: 1.4,
            geo_cache_size: 10_000,
            road_table_max_locations: 100,
            road_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let base = serde_json::to_value(Self::default()).expect("default config always serializes");
        let mut overlay: serde_json::Value = serde_json::from_str(raw)?;
        merge_json(&mut overlay, base);
        let merged: Self = serde_json::from_value(overlay)?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn vehicle_penalty(&self, vehicle: VehicleType) -> f64 {
        match vehicle {
            VehicleType::Motorbike => self.penalty_motorbike,
            VehicleType::Bike => self.penalty_bike,
            VehicleType::Car => self.penalty_car,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_speed_minutes <= 0 {
            return Err(ConfigError::OutOfRange {
                field: "simulation_speed_minutes",
                constraint: "> 0",
                value: self.simulation_speed_minutes.to_string(),
            });
        }
        if self.max_bundle_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_bundle_size",
                constraint: "> 0",
                value: self.max_bundle_size.to_string(),
            });
        }
        if self.avg_speed_kmh <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "avg_speed_kmh",
                constraint: "> 0",
                value: self.avg_speed_kmh.to_string(),
            });
        }
        if self.simulation_end_time <= self.start_time {
            return Err(ConfigError::OutOfRange {
                field: "simulation_end_time",
                constraint: "> start_time",
                value: self.simulation_end_time.to_string(),
            });
        }
        Ok(())
    }
}

/// Fills in any field `overlay` is missing from `base`, recursively, so a
/// config file only needs to specify the fields it overrides.
fn merge_json(overlay: &mut serde_json::Value, base: serde_json::Value) {
    if let (serde_json::Value::Object(overlay_map), serde_json::Value::Object(base_map)) =
        (overlay, base)
    {
        for (key, base_value) in base_map {
            overlay_map.entry(key).or_insert(base_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn overlay_keeps_unset_fields() {
        let cfg = Config::from_json(r#"{"w_distance": 2.0}"#).unwrap();
        assert_eq!(cfg.w_distance, 2.0);
        assert_eq!(cfg.w_delay, Config::default().w_delay);
    }

    #[test]
    fn rejects_bad_speed() {
        let err = Config::from_json(r#"{"avg_speed_kmh": 0.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }
}
