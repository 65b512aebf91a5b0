//! Loading the server configuration from environment variables.
//!
//! The variables may be set in a `.env` file, which is read by `main()` before any of the
//! functions in this module are called.

use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};

const DATABASE_URL: &str = "DATABASE_URL";
const SECRET: &str = "SECRET";
const LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
const LISTEN_PORT: &str = "LISTEN_PORT";

/// Settings for running the room booking web server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// PostgreSQL connection url of the room booking database
    pub database_url: String,
    /// Cryptographic application secret for signing session tokens
    pub secret: String,
    /// Interface address to bind the web server to
    pub listen_address: String,
    pub listen_port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, SetupError> {
        Self::from_lookup(|name| env::var(name))
    }

    /// Get the database URL only, for CLI commands which don't run the web server
    pub fn database_url_from_env() -> Result<String, SetupError> {
        required(&|name| env::var(name), DATABASE_URL)
    }

    /// Get the session token secret only, for CLI commands which don't run the web server
    pub fn secret_from_env() -> Result<String, SetupError> {
        secret(&|name| env::var(name))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SetupError>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        Ok(Self {
            database_url: required(&lookup, DATABASE_URL)?,
            secret: secret(&lookup)?,
            listen_address: required(&lookup, LISTEN_ADDRESS)?,
            listen_port: required(&lookup, LISTEN_PORT)?.parse().map_err(|_| {
                SetupError::EnvVariableInvalid {
                    variable_name: LISTEN_PORT,
                    problem: "Not a valid uint16",
                }
            })?,
        })
    }
}

fn required<F>(lookup: &F, variable_name: &'static str) -> Result<String, SetupError>
where
    F: Fn(&'static str) -> Result<String, VarError>,
{
    lookup(variable_name).map_err(|e| SetupError::from_env_error(e, variable_name))
}

fn secret<F>(lookup: &F) -> Result<String, SetupError>
where
    F: Fn(&'static str) -> Result<String, VarError>,
{
    let secret = required(lookup, SECRET)?;
    if secret.trim().is_empty() {
        return Err(SetupError::EnvVariableInvalid {
            variable_name: SECRET,
            problem: "must not be empty",
        });
    }
    Ok(secret)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}
