pub mod config;
pub mod core;
pub mod logging;
pub mod messaging;
pub mod storage;
