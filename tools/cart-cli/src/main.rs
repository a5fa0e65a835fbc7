//! Cart CLI - work with a storefront cart from the terminal.
//!
//! Commands:
//! - `cart show` - Print the cart and its totals
//! - `cart set` - Type a quantity into a row
//! - `cart inc` / `cart dec` - Step a row's quantity
//! - `cart remove` - Remove a product
//! - `cart config` - Manage configuration

mod commands;
mod config;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::step::Direction;
use commands::{ConfigArgs, RemoveArgs, SetArgs, ShowArgs, StepArgs};

/// Cart CLI - view and edit a TurboCommerce storefront cart
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Session file path
    #[arg(long, global = true)]
    session: Option<String>,

    /// Cart id, overriding config and session
    #[arg(long, global = true)]
    cart: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show(ShowArgs),

    /// Set a row's quantity
    Set(SetArgs),

    /// Increase a row's quantity by one
    Inc(StepArgs),

    /// Decrease a row's quantity by one
    Dec(StepArgs),

    /// Remove a product from the cart
    Remove(RemoveArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let overrides = context::Overrides {
        config: cli.config,
        session: cli.session,
        cart: cli.cart,
    };
    let ctx = match context::Context::load(overrides, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&ctx.config.log, cli.verbose) {
        ctx.output.warn(&format!("Logging disabled: {}", e));
    }

    // Execute command
    let result = match cli.command {
        Commands::Show(args) => commands::show::run(args, &ctx).await,
        Commands::Set(args) => commands::set::run(args, &ctx).await,
        Commands::Inc(args) => commands::step::run(args, Direction::Up, &ctx).await,
        Commands::Dec(args) => commands::step::run(args, Direction::Down, &ctx).await,
        Commands::Remove(args) => commands::remove::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
