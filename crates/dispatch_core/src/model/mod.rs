mod bundle;
mod courier;
mod order;
mod stop;

pub use bundle::Bundle;
pub use courier::{Courier, CourierStatus, VehicleType};
pub use order::{Order, OrderStatus};
pub use stop::{Location, Stop, StopKind};
