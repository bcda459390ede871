//! Dataset loader: two tabular sources (orders, couriers) into entities.
//!
//! Grounded on `btmxh-dpdp_rust/src/model/{order.rs,vehicle_info.rs,mod.rs}`'s
//! `csv::Reader::from_path(...).deserialize()` pattern, generalized to the
//! dual time-format parsing this format requires (handled by
//! [`crate::time::SimTime::parse`] rather than a `serde` deserializer, since
//! the two accepted formats aren't expressible as one `chrono` format
//! string).

use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::model::{Courier, Order, VehicleType};
use crate::time::SimTime;

#[derive(Debug, Deserialize)]
struct OrderRow {
    order_id: String,
    pickup_lat: f64,
    pickup_lng: f64,
    dropoff_lat: f64,
    dropoff_lng: f64,
    created_time: String,
    estimated_delivery_time_min: i64,
}

#[derive(Debug, Deserialize)]
struct CourierRow {
    courier_id: String,
    courier_lat: f64,
    courier_lng: f64,
    vehicle_type: String,
    bundle_capacity: usize,
    available_from: String,
}

pub fn load_orders(path: impl AsRef<Path>) -> Result<Vec<Order>, LoadError> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::Io {
        file: file_name.clone(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e),
    })?;

    let mut orders = Vec::new();
    for (row_index, record) in reader.deserialize::<OrderRow>().enumerate() {
        let row: OrderRow = record.map_err(|e| LoadError::Csv {
            file: file_name.clone(),
            row: row_index + 1,
            source: e,
        })?;
        let created_time = SimTime::parse(&row.created_time, "created_time")?;
        orders.push(Order::new(
            row.order_id,
            (row.pickup_lat, row.pickup_lng),
            (row.dropoff_lat, row.dropoff_lng),
            created_time,
            row.estimated_delivery_time_min,
        ));
    }

    // Strictly sorted by created_time, ties broken by insertion (original
    // file) order, per the ordering guarantee.
    orders.sort_by(|a, b| a.created_time.cmp(&b.created_time));
    Ok(orders)
}

pub fn load_couriers(path: impl AsRef<Path>) -> Result<Vec<Courier>, LoadError> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::Io {
        file: file_name.clone(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e),
    })?;

    let mut couriers = Vec::new();
    for (row_index, record) in reader.deserialize::<CourierRow>().enumerate() {
        let row: CourierRow = record.map_err(|e| LoadError::Csv {
            file: file_name.clone(),
            row: row_index + 1,
            source: e,
        })?;
        let vehicle_type = VehicleType::parse(&row.vehicle_type)
            .ok_or_else(|| LoadError::UnknownVehicleType(row.vehicle_type.clone()))?;
        let available_from = SimTime::parse(&row.available_from, "available_from")?;
        couriers.push(Courier::new(
            row.courier_id,
            (row.courier_lat, row.courier_lng),
            vehicle_type,
            row.bundle_capacity,
            available_from,
        ));
    }

    Ok(couriers)
}
