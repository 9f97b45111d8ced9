pub mod dynamodb_repository;
pub mod models;
pub mod store;
