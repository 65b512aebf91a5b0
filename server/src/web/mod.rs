use crate::cli::database_migration::check_migration_state;
use crate::cli_error::CliError;
use crate::data_store::get_store;
use crate::kitchen::notification_channel::KitchenNotificationChannel;
use crate::setup::ServerConfig;
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use std::sync::Arc;

mod api;
mod http_error_logging;
pub mod kitchen_socket;

pub fn serve() -> Result<(), CliError> {
    check_migration_state()?;
    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config)?;
    let kitchen_channel = state.kitchen_channel.clone();
    let ServerConfig {
        listen_address,
        listen_port,
        ..
    } = config;
    info!("Starting web server on {}:{}", listen_address, listen_port);
    let result = actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(api::configure_app)
                    .service(kitchen_socket::kitchen_websocket)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(middleware::from_fn(
                        http_error_logging::error_logging_middleware,
                    ))
                    .wrap(middleware::Compress::default())
            })
            .bind((listen_address, listen_port))
            .map_err(CliError::BindError)?
            .run(),
        )
        .map_err(CliError::ServerError);
    kitchen_channel.shutdown();
    result
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn crate::data_store::RoomBookStore>,
    secret: String,
    kitchen_channel: KitchenNotificationChannel,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, CliError> {
        Ok(Self {
            store: Arc::new(get_store(&config.database_url)?),
            secret: config.secret.clone(),
            kitchen_channel: KitchenNotificationChannel::new(),
        })
    }
}
