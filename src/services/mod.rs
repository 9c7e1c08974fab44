pub mod collections;
pub mod listing_service;
pub mod object_service;
pub mod query_cache;
pub mod upstream;
