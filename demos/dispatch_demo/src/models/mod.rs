// baton/demos/dispatch_demo/src/models/mod.rs

pub mod courier;
pub mod order;
pub mod weather;

pub use courier::{Courier, CourierStatus, GeoPoint, VehicleCapacity};
pub use order::{ItemSize, Merchant, OrderItem, PaymentRecord, Transaction, TransactionStatus};
pub use weather::WeatherReport;
