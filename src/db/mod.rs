pub mod sqlite;
pub mod store;

pub use sqlite::create_pool;
pub use store::Store;
