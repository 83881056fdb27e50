pub mod client;
pub mod datasources;
pub mod instances;
pub mod projects;
pub mod workflows;
