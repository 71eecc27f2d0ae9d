pub mod config;
pub mod detect;
pub mod fetch;
pub mod orchestrator;
pub mod repository;
pub mod schema;
pub mod validator;
pub mod workspace;
