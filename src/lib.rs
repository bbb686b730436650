pub mod config;
pub mod fetch;
pub mod reshape;
pub mod sink;
