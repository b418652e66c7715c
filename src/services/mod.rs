// Core checkout pipeline
pub mod catalog;
pub mod orders;
pub mod pricing;

// Cart line management
pub mod carts;
