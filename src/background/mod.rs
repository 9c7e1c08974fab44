pub mod collections_refresher;
