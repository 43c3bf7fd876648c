pub mod application;
pub mod cleaner;
pub mod domain;
pub mod loader;
pub mod ports;
pub mod utils;
