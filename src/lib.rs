pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod geocode;
pub mod io;
pub mod photos;
pub mod storage;

pub use domain::*;
pub use storage::RecordStore;
