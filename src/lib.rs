//! Vessel tracking: periodic feed polling, detection of vessels not seen
//! before, and a searchable, sortable, paginated view of the fleet.

pub mod config;
pub mod display;
pub mod errors;
pub mod feed;
pub mod models;
pub mod notify;
pub mod novelty;
pub mod store;
pub mod tracker;
pub mod view;
