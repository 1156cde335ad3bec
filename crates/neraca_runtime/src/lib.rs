pub mod auth;
pub mod dashboard;
pub mod datastore;
pub mod errors;
pub mod queries;
pub mod report;
pub mod seed;
pub mod store;
