use crate::auth_session::SessionToken;
use crate::cli::util::{query_user_and_check, query_user_bool};
use crate::cli::CliAuthTokenKey;
use crate::cli_error::CliError;
use crate::data_store::auth_token::{AccessRole, AuthToken};
use crate::data_store::models::{NewUser, User, UserRolesPatch};
use crate::data_store::{get_store_from_env, RoomBookStore, RoomBookStoreFacade, StoreError};
use crate::setup::ServerConfig;

pub fn print_user_list() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());
    let users = data_store.get_users(&auth_token)?;

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec!["id", "username", "full name", "roles", "created"])
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .add_rows(users.into_iter().map(|user| {
            [
                user.id.to_string(),
                user.username.clone(),
                user.full_name.clone(),
                user.roles()
                    .iter()
                    .map(AccessRole::name)
                    .collect::<Vec<_>>()
                    .join(", "),
                user.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        }));

    println!("{table}");
    Ok(())
}

pub fn create_user() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let username: String = query_user_and_check("Username", |v: &String| {
        if v.is_empty() || v.chars().any(char::is_whitespace) {
            Err("Username must not be empty or contain whitespace")
        } else {
            Ok(())
        }
    });
    let full_name: String = query_user_and_check("Full name", |v: &String| {
        if v.is_empty() {
            Err("Full name must not be empty")
        } else {
            Ok(())
        }
    });
    let is_admin = query_user_bool("Grant admin role (manage rooms and all bookings)?", Some(false));
    let is_kitchen = query_user_bool("Grant kitchen role (process kitchen orders)?", Some(false));

    let user = data_store.create_user(
        &auth_token,
        NewUser {
            id: uuid::Uuid::now_v7(),
            username,
            full_name,
            is_admin,
            is_kitchen,
        },
    )?;
    println!("Created user {} with id {}.", user.username, user.id);
    Ok(())
}

/// Print a new signed session token for the user with the given username
pub fn issue_session_token(username: &str) -> Result<(), CliError> {
    let secret = ServerConfig::secret_from_env()?;
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());
    let user = find_user(data_store.as_mut(), &auth_token, username)?;

    println!("{}", SessionToken::new_for_user(user.id).as_string(&secret));
    Ok(())
}

/// Grant or revoke the admin and kitchen roles of an existing user. Roles given as None are kept.
pub fn set_user_roles(
    username: &str,
    is_admin: Option<bool>,
    is_kitchen: Option<bool>,
) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());
    let user = find_user(data_store.as_mut(), &auth_token, username)?;

    let patch = UserRolesPatch {
        is_admin,
        is_kitchen,
    };
    if patch.is_empty() {
        return Err(CliError::DataError(
            "Nothing to change. Use --admin and/or --kitchen.".to_owned(),
        ));
    }
    let user = data_store.update_user_roles(&auth_token, user.id, patch)?;
    println!(
        "Roles of {}: {}",
        user.username,
        user.roles()
            .iter()
            .map(AccessRole::name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn find_user(
    data_store: &mut dyn RoomBookStoreFacade,
    auth_token: &AuthToken,
    username: &str,
) -> Result<User, CliError> {
    data_store
        .get_user_by_username(auth_token, username)
        .map_err(|e| match e {
            StoreError::NotExisting => {
                CliError::DataError(format!("User '{}' does not exist", username))
            }
            e => e.into(),
        })
}
