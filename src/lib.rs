pub mod clipboard;
pub mod config;
pub mod engine;
pub mod events;
pub mod export;
pub mod feature;
pub mod features;
pub mod import;
pub mod logging;
pub mod model;
pub mod mvi;
pub mod selection;
pub mod store;
