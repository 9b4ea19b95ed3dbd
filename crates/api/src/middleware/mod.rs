pub mod auth;
pub mod query_params;
