//! Fleet-level key performance indicators, computed once at the end of a
//! run from the accumulated completed missions and tick counters.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::time::SimTime;

/// One completed order: delivered, with both timestamps recorded.
#[derive(Debug, Clone)]
pub struct Mission {
    pub order_id: String,
    pub driver_id: String,
    pub created_time: SimTime,
    pub pickup_time: SimTime,
    pub dropoff_time: SimTime,
}

impl Mission {
    pub fn duration_min(&self) -> f64 {
        (self.dropoff_time - self.created_time) as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierTrack {
    pub driver_id: String,
    pub positions: Vec<(i64, f64, f64)>,
}

/// Accumulates per-tick counters the aggregator cannot recompute from
/// `completed_missions` alone (utilization, driver activation).
#[derive(Debug, Clone, Default)]
pub struct KpiAccumulator {
    pub driver_ticks: u64,
    pub busy_driver_ticks: u64,
    pub drivers_activated: HashSet<String>,
}

impl KpiAccumulator {
    pub fn record_tick(&mut self, total_couriers: usize, busy_couriers: usize) {
        self.driver_ticks += total_couriers as u64;
        self.busy_driver_ticks += busy_couriers as u64;
    }

    pub fn activate(&mut self, driver_id: &str) {
        self.drivers_activated.insert(driver_id.to_string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiReport {
    pub strategy: String,
    pub orders_total: usize,
    pub orders_delivered: usize,
    pub success_rate: f64,

    pub duration_mean_min: f64,
    pub duration_median_min: f64,
    pub duration_min_min: f64,
    pub duration_max_min: f64,
    pub duration_stdev_min: f64,
    pub duration_p90_min: f64,
    pub duration_p95_min: f64,
    pub duration_p99_min: f64,

    pub total_distance_km: f64,
    pub distance_per_order_km: f64,
    pub distance_per_driver_km: f64,

    pub on_time_count: usize,
    pub on_time_rate: f64,
    pub late_over_30_count: usize,
    pub late_over_30_rate: f64,
    pub late_over_45_count: usize,
    pub late_over_45_rate: f64,
    pub late_over_60_count: usize,
    pub late_over_60_rate: f64,

    pub fleet_utilization: f64,
    pub drivers_used: usize,
    pub orders_per_driver: f64,
    pub active_driver_efficiency: f64,

    pub route_history: Vec<CourierTrack>,
}

pub fn compute(
    strategy: &str,
    orders_total: usize,
    missions: &[Mission],
    total_distance_km: f64,
    accumulator: &KpiAccumulator,
    route_history: Vec<CourierTrack>,
) -> KpiReport {
    let delivered = missions.len();
    let mut durations: Vec<f64> = missions.iter().map(Mission::duration_min).collect();
    durations.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let duration_mean_min = mean(&durations);
    let duration_median_min = percentile(&durations, 50.0);
    let duration_min_min = durations.first().copied().unwrap_or(0.0);
    let duration_max_min = durations.last().copied().unwrap_or(0.0);
    let duration_stdev_min = stdev(&durations, duration_mean_min);
    let duration_p90_min = percentile(&durations, 90.0);
    let duration_p95_min = percentile(&durations, 95.0);
    let duration_p99_min = percentile(&durations, 99.0);

    let on_time_count = durations.iter().filter(|&&d| d <= 30.0).count();
    let late_over_30_count = durations.iter().filter(|&&d| d > 30.0).count();
    let late_over_45_count = durations.iter().filter(|&&d| d > 45.0).count();
    let late_over_60_count = durations.iter().filter(|&&d| d > 60.0).count();

    let rate = |count: usize| if delivered > 0 { count as f64 / delivered as f64 } else { 0.0 };

    let drivers_used = accumulator.drivers_activated.len();
    let fleet_utilization = if accumulator.driver_ticks > 0 {
        accumulator.busy_driver_ticks as f64 / accumulator.driver_ticks as f64
    } else {
        0.0
    };

    KpiReport {
        strategy: strategy.to_string(),
        orders_total,
        orders_delivered: delivered,
        success_rate: if orders_total > 0 { delivered as f64 / orders_total as f64 } else { 0.0 },

        duration_mean_min,
        duration_median_min,
        duration_min_min,
        duration_max_min,
        duration_stdev_min,
        duration_p90_min,
        duration_p95_min,
        duration_p99_min,

        total_distance_km,
        distance_per_order_km: if delivered > 0 { total_distance_km / delivered as f64 } else { 0.0 },
        distance_per_driver_km: if drivers_used > 0 { total_distance_km / drivers_used as f64 } else { 0.0 },

        on_time_count,
        on_time_rate: rate(on_time_count),
        late_over_30_count,
        late_over_30_rate: rate(late_over_30_count),
        late_over_45_count,
        late_over_45_rate: rate(late_over_45_count),
        late_over_60_count,
        late_over_60_rate: rate(late_over_60_count),

        fleet_utilization,
        drivers_used,
        orders_per_driver: if drivers_used > 0 { delivered as f64 / drivers_used as f64 } else { 0.0 },
        active_driver_efficiency: if drivers_used > 0 { delivered as f64 / drivers_used as f64 } else { 0.0 },

        route_history,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stdev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Nearest-rank percentile over an already-sorted slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_single_value() {
        assert_eq!(percentile(&[10.0], 90.0), 10.0);
    }

    #[test]
    fn percentile_matches_nearest_rank() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 90.0), 9.0);
    }

    #[test]
    fn active_driver_efficiency_matches_orders_per_driver() {
        let missions = vec![Mission {
            order_id: "o1".into(),
            driver_id: "d1".into(),
            created_time: SimTime::from_minutes(0),
            pickup_time: SimTime::from_minutes(5),
            dropoff_time: SimTime::from_minutes(15),
        }];
        let mut acc = KpiAccumulator::default();
        acc.activate("d1");
        let report = compute("baseline", 1, &missions, 1.2, &acc, vec![]);
        assert_eq!(report.active_driver_efficiency, report.orders_per_driver);
        assert_eq!(report.drivers_used, 1);
    }

    #[test]
    fn empty_missions_have_zeroed_rates() {
        let acc = KpiAccumulator::default();
        let report = compute("baseline", 0, &[], 0.0, &acc, vec![]);
        assert_eq!(report.orders_delivered, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.on_time_rate, 0.0);
    }
}
