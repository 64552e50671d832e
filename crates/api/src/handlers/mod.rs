pub mod couriers;
pub mod delivery;
pub mod health;
pub mod metrics;
