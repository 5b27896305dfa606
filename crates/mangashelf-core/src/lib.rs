pub mod catalog;
pub mod config;
pub mod covers;
pub mod group;
pub mod http;
pub mod logging;
pub mod naming;
pub mod publishers;
pub mod report;
pub mod storage;
