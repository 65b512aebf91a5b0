use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, warn};
use roombook_server::cli::{database_migration, manage_users};
use roombook_server::cli_error::CliError;
use roombook_server::kitchen::client::run_kitchen_listener;

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run_command(args.command) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve => roombook_server::web::serve(),
        Command::MigrateDatabase => database_migration::run_migrations(),
        Command::CreateUser => manage_users::create_user(),
        Command::ListUsers => manage_users::print_user_list(),
        Command::IssueSessionToken { username } => manage_users::issue_session_token(&username),
        Command::SetUserRoles {
            username,
            admin,
            kitchen,
        } => manage_users::set_user_roles(&username, admin, kitchen),
        Command::KitchenListen { server_url, token } => Ok(actix_web::rt::System::new()
            .block_on(run_kitchen_listener(server_url, token))?),
    }
}

/// Room booking server with catering dispatch to the kitchen
#[derive(Debug, Parser)]
#[clap(name = "roombook_server", version = roombook_server::get_version())]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the room booking web API
    Serve,
    /// Apply pending database schema migrations
    MigrateDatabase,
    /// Interactively create a new user
    CreateUser,
    /// Print a table of all users and their roles
    ListUsers,
    /// Print a new session token for the given user
    IssueSessionToken {
        /// Username of the user
        username: String,
    },
    /// Grant or revoke the admin and kitchen roles of a user
    SetUserRoles {
        /// Username of the user
        username: String,
        /// Whether the user is an administrator
        #[clap(long)]
        admin: Option<bool>,
        /// Whether the user is a kitchen worker
        #[clap(long)]
        kitchen: Option<bool>,
    },
    /// Connect to a server as kitchen worker and print incoming kitchen orders
    KitchenListen {
        /// Base URL of the server, e.g. http://localhost:9000
        #[clap(long)]
        server_url: url::Url,
        /// Session token of the kitchen worker (see issue-session-token)
        #[clap(long)]
        token: String,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
