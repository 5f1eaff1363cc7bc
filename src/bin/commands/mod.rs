pub mod check_db;
pub mod config;
pub mod tracking_code;
pub mod vacuum;
