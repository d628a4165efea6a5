//! Souq CLI - Inspect and edit the locally persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Add two hammers
//! souq cart add 1 --name Hammer --price 10 -q 2
//!
//! # Add a product record exactly as the catalog API returned it
//! souq cart import '{"id": 7, "name": "Drill", "sale_price": "24.500", "stock_quantity": 3}'
//!
//! # Adjust quantities
//! souq cart inc 7
//! souq cart dec 1
//!
//! # Show lines and totals
//! souq cart show
//!
//! # Empty the cart
//! souq cart clear
//! ```
//!
//! # Configuration
//!
//! Storage location and pricing come from `SOUQ_*` environment variables
//! (see `souq_cart::config`); `--dir` and `--key` override the first two.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use souq_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "souq")]
#[command(author, version, about = "Souq storefront CLI tools")]
struct Cli {
    /// Directory holding the persisted cart (overrides `SOUQ_CART_DIR`)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Storage key of the cart (overrides `SOUQ_CART_KEY`)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product by id with optional descriptive fields
    Add {
        /// Product id (integer or SKU)
        id: ProductId,

        /// Product name
        #[arg(short, long)]
        name: Option<String>,

        /// Unit price
        #[arg(short, long)]
        price: Option<String>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Extra field as `key=value` (JSON values are parsed, e.g. `stock_quantity=4`)
        #[arg(short, long = "field", value_parser = commands::cart::parse_field)]
        fields: Vec<(String, serde_json::Value)>,
    },
    /// Add a product from a raw JSON record
    Import {
        /// Product record, e.g. '{"id": 1, "name": "Hammer", "price": 10}'
        json: String,
    },
    /// Remove a product's line
    Remove {
        id: ProductId,
    },
    /// Increase a product's quantity by one
    Inc {
        id: ProductId,

        /// Increase even past the recorded stock level
        #[arg(long)]
        force: bool,
    },
    /// Decrease a product's quantity by one (never below 1)
    Dec {
        id: ProductId,
    },
    /// Remove every line
    Clear,
    /// Show lines and totals
    Show {
        /// Print the persisted JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "souq=info,souq_cart=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::load(cli.dir, cli.key)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Add {
                id,
                name,
                price,
                quantity,
                fields,
            } => commands::cart::add(&ctx, id, name, price, quantity, fields),
            CartAction::Import { json } => commands::cart::import(&ctx, &json)?,
            CartAction::Remove { id } => commands::cart::remove(&ctx, &id),
            CartAction::Inc { id, force } => commands::cart::increase(&ctx, &id, force),
            CartAction::Dec { id } => commands::cart::decrease(&ctx, &id),
            CartAction::Clear => commands::cart::clear(&ctx),
            CartAction::Show { json } => commands::cart::show(&ctx, json)?,
        },
    }
    Ok(())
}
