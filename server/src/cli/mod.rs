pub mod database_migration;
pub mod manage_users;
mod util;

/// Key for creating [crate::data_store::auth_token::AuthToken]s with full privileges for command
/// line functions. Must not be created in the web server.
pub struct CliAuthTokenKey {
    _private: (),
}

impl CliAuthTokenKey {
    #[allow(clippy::new_without_default)] // We always want to explicitly create these objects
    pub fn new() -> Self {
        Self { _private: () }
    }
}
