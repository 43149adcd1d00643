pub mod projectioncache;
pub mod store;
