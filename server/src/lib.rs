mod auth_session;
pub mod cli;
pub mod cli_error;
mod data_store;
pub mod kitchen;
pub mod scheduling;
mod setup;
pub mod web;

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
