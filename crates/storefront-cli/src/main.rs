//! Storefront CLI
//!
//! Command-line back office for the storefront: catalog editing, customer
//! submissions, newsletter signups and the submission ingress server.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use storefront_core::{Config, Price, Storefront};

mod commands;
mod output;

use commands::product::ProductFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront back office: catalog, submissions and ingress")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the product catalog
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Review customer form submissions
    Submission {
        #[command(subcommand)]
        command: SubmissionCommands,
    },
    /// Sign an address up for the newsletter
    Subscribe {
        /// Subscriber email address
        email: String,
        /// Subscriber name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Run the submission ingress server
    Serve {
        /// Address to listen on (defaults to listen_addr)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Show backend, session and table status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// List products, newest first
    #[command(alias = "ls")]
    List {
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show product details
    Show {
        /// Product ID (full or prefix)
        id: String,
    },
    /// Add a product
    #[command(alias = "create")]
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// Selling price, e.g. 499 or "1,299.50"
        #[arg(long)]
        price: Price,
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Change fields of a product
    #[command(alias = "edit")]
    Update {
        /// Product ID (full or prefix)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<Price>,
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Delete a product
    #[command(alias = "rm")]
    Delete {
        /// Product ID (full or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum SubmissionCommands {
    /// List submissions, newest first
    #[command(alias = "ls")]
    List {
        /// Only show this status (pending, processing, completed, cancelled)
        #[arg(short, long)]
        status: Option<String>,
        /// Only show this form type
        #[arg(short = 't', long = "type")]
        form_type: Option<String>,
    },
    /// Show submission details
    Show {
        /// Submission ID (full or prefix)
        id: String,
    },
    /// Set the processing status
    Status {
        /// Submission ID (full or prefix)
        id: String,
        /// New status
        status: String,
    },
    /// Replace the operator notes
    Note {
        /// Submission ID (full or prefix)
        id: String,
        /// Note text
        text: String,
    },
    /// Delete a submission
    #[command(alias = "rm")]
    Delete {
        /// Submission ID (full or prefix)
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (backend, backend_url, user_id, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flags(cli.json, cli.quiet);

    // Config commands work even when the config is unusable
    if let Commands::Config { command } = &cli.command {
        let output = Output::new(format);
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let output = Output::new(format).with_currency(&config.currency_symbol);
    let mut shop = Storefront::open_with_config(config).await?;

    match cli.command {
        Commands::Product { command } => handle_product_command(command, &mut shop, &output).await,
        Commands::Submission { command } => {
            handle_submission_command(command, &mut shop, &output).await
        }
        Commands::Subscribe { email, name } => {
            commands::subscribe::subscribe(&shop, email, name, &output).await
        }
        Commands::Serve { listen } => commands::serve::serve(&shop, listen, &output).await,
        Commands::Status => commands::status::show(&shop, &output).await,
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

async fn handle_product_command(
    command: ProductCommands,
    shop: &mut Storefront,
    output: &Output,
) -> Result<()> {
    match command {
        ProductCommands::List { category } => commands::product::list(shop, category, output),
        ProductCommands::Show { id } => commands::product::show(shop, id, output),
        ProductCommands::Add {
            name,
            price,
            fields,
        } => {
            let session = shop.session().await?;
            commands::product::add(shop, &session, name, price, fields, output).await
        }
        ProductCommands::Update {
            id,
            name,
            price,
            fields,
        } => {
            let session = shop.session().await?;
            commands::product::update(shop, &session, id, name, price, fields, output).await
        }
        ProductCommands::Delete { id } => {
            let session = shop.session().await?;
            commands::product::delete(shop, &session, id, output).await
        }
    }
}

async fn handle_submission_command(
    command: SubmissionCommands,
    shop: &mut Storefront,
    output: &Output,
) -> Result<()> {
    let session = shop.session().await?;

    match command {
        SubmissionCommands::List { status, form_type } => {
            commands::submission::list(shop, &session, status, form_type, output)
        }
        SubmissionCommands::Show { id } => commands::submission::show(shop, &session, id, output),
        SubmissionCommands::Status { id, status } => {
            commands::submission::set_status(shop, &session, id, status, output).await
        }
        SubmissionCommands::Note { id, text } => {
            commands::submission::note(shop, &session, id, text, output).await
        }
        SubmissionCommands::Delete { id } => {
            commands::submission::delete(shop, &session, id, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Level comes from STOREFRONT_LOG (default "warn"); RUST_LOG replaces the
/// whole filter when set. Logs go to stderr, or to `log_file` when configured.
fn init_logging(config: &Config) {
    let log_level = std::env::var("STOREFRONT_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "storefront_core={},storefront_cli={}",
            log_level, log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match config.log_file {
        Some(ref log_path) => match File::create(log_path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }

    debug!("Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_product_add() {
        let cli = Cli::try_parse_from([
            "storefront",
            "--json",
            "product",
            "add",
            "--name",
            "Face Cream",
            "--price",
            "1,299.50",
            "--category",
            "Skincare",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Product {
                command:
                    ProductCommands::Add {
                        name,
                        price,
                        fields,
                    },
            } => {
                assert_eq!(name, "Face Cream");
                assert_eq!(price, Price::from_minor(129_950));
                assert_eq!(fields.category.as_deref(), Some("Skincare"));
            }
            _ => panic!("expected product add"),
        }
    }

    #[test]
    fn test_bad_price_is_rejected() {
        let result = Cli::try_parse_from([
            "storefront",
            "product",
            "add",
            "--name",
            "Serum",
            "--price",
            "free",
        ]);
        assert!(result.is_err());
    }
}
