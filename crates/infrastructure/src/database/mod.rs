pub mod manager;
pub mod memory;
pub mod postgres;

pub use manager::{DatabaseManager, DatabaseType};
pub use memory::{InMemoryCourierRepository, InMemoryDeliveryRepository, MemoryStore};
pub use postgres::{PostgresCourierRepository, PostgresDeliveryRepository};
