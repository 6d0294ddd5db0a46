pub mod classification;
pub mod client;
pub mod job;
pub mod ports;
pub mod transaction;
pub mod vault;
