//! TechHub CLI - command-line storefront for the TechHub backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the token is kept in the session file)
//! techhub login -u jane --password hunter22
//!
//! # Browse the catalog
//! techhub products --page 2 --category Processors --sort price-low
//!
//! # Work with the cart
//! techhub cart add 64f1c2
//! techhub cart qty 64f1c2 3
//! techhub cart clear --yes
//!
//! # Turn the cart into an estimate
//! techhub checkout
//! ```
//!
//! # Environment Variables
//!
//! - `TECHHUB_API_BASE_URL` - Backend base URL
//! - `TECHHUB_SESSION_FILE` - Where the session token is kept
//! - `TECHHUB_PASSWORD` - Password for `login`, instead of `--password`
//! - `SENTRY_DSN` - Enables error reporting
//! - `RUST_LOG` - Log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use techhub_storefront::config::StorefrontConfig;
use techhub_storefront::services::catalog::SortOrder;
use techhub_storefront::state::Storefront;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "techhub")]
#[command(author, version, about = "TechHub storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(long, env = "TECHHUB_PASSWORD", hide_env_values = true)]
        password: SecretString,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long, env = "TECHHUB_PASSWORD", hide_env_values = true)]
        password: SecretString,

        /// Company name
        #[arg(long)]
        company: String,

        /// Contact person
        #[arg(long)]
        contact: String,

        /// 10-digit phone number (formatting allowed)
        #[arg(long)]
        phone: String,

        /// Business category
        #[arg(long)]
        category: String,
    },
    /// Change a password using the current one
    ForgotPassword {
        #[arg(short, long)]
        username: String,

        #[arg(long)]
        current_password: SecretString,

        #[arg(long)]
        new_password: SecretString,
    },
    /// Sign out and forget the local cart
    Logout,
    /// Show the session and the signed-in profile
    Whoami,
    /// List products
    Products {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,

        /// `featured`, `price-low` or `price-high`
        #[arg(short, long, default_value = "featured")]
        sort: SortOrder,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Submit the cart as an estimate
    Checkout,
    /// View or edit the account profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove a line
    Remove { product_id: String },
    /// Set a line's quantity (0 removes it)
    Qty { product_id: String, quantity: u32 },
    /// Remove everything
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Change profile fields; omitted fields keep their value
    Update {
        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        contact: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => return report(&CliError::from(e)),
    };

    // Sentry must be up before the subscriber so the layer has a client
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "techhub_storefront=info,techhub_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(err: &CliError) -> ExitCode {
    tracing::debug!(error = %err, "Command failed");
    let _ = writeln!(std::io::stderr().lock(), "Error: {}", err.user_message());
    ExitCode::FAILURE
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let shop = Storefront::new(config)?;
    let (_, verify) = shop.bootstrap().await?;

    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Login { username, password } => {
            commands::account::login(&shop, &mut out, &username, &password).await?;
        }
        Commands::Register {
            username,
            email,
            password,
            company,
            contact,
            phone,
            category,
        } => {
            let form = techhub_storefront::services::auth::RegistrationForm {
                username,
                email,
                password,
                company_name: company,
                contact_person: contact,
                phone,
                category,
            };
            commands::account::register(&shop, &mut out, form).await?;
        }
        Commands::ForgotPassword {
            username,
            current_password,
            new_password,
        } => {
            commands::account::forgot_password(
                &shop,
                &mut out,
                &username,
                &current_password,
                &new_password,
            )
            .await?;
        }
        Commands::Logout => commands::account::logout(&shop, &mut out).await?,
        Commands::Whoami => commands::account::whoami(&shop, &mut out, verify).await?,
        Commands::Products {
            page,
            category,
            sort,
        } => {
            commands::shop::products(&shop, &mut out, page, category.as_deref(), sort).await?;
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::show_cart(&shop, &mut out).await?,
            CartAction::Add { product_id } => {
                commands::shop::add(&shop, &mut out, product_id.into()).await?;
            }
            CartAction::Remove { product_id } => {
                commands::shop::remove(&shop, &mut out, &product_id.into()).await?;
            }
            CartAction::Qty {
                product_id,
                quantity,
            } => {
                commands::shop::set_quantity(&shop, &mut out, &product_id.into(), quantity)
                    .await?;
            }
            CartAction::Clear { yes } => commands::shop::clear(&shop, &mut out, yes).await?,
        },
        Commands::Checkout => commands::shop::checkout(&shop, &mut out).await?,
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&shop, &mut out).await?,
            ProfileAction::Update {
                company,
                contact,
                phone,
            } => {
                let changes = commands::profile::Changes {
                    company_name: company,
                    contact_person: contact,
                    phone,
                };
                commands::profile::update(&shop, &mut out, changes).await?;
            }
        },
    }
    Ok(())
}
