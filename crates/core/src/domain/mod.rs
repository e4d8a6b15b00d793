pub mod mention;
pub mod thread;
