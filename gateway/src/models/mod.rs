pub mod instance;
pub mod workflow;
