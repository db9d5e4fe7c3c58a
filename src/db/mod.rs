pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, migrate, PgStore};
pub use seed::{seed_from_file, seed_movies};
pub use store::Store;

#[cfg(test)]
pub use store::MockStore;
