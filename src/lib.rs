pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod linker;
pub mod output;
pub mod publisher;
pub mod registrar;
pub mod resolver;
pub mod row;
pub mod schema;
pub mod sheets;
pub mod upload;
