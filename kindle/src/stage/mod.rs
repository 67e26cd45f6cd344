pub mod component;
pub mod distributor;
pub mod loader;
pub mod processor;
pub mod types;
