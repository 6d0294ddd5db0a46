pub mod classifier;
pub mod orchestrator;
pub mod risk;
pub mod transactions;
pub mod vault;
