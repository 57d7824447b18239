// Library root: configuration, the Yahoo client, and the keeper service.

pub mod config;
pub mod service;
pub mod yahoo;
