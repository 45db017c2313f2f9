//! # Seed Data Generator
//!
//! Populates the database with development consoles and retail products.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p arcadia-db --bin seed
//!
//! # Specify database path
//! cargo run -p arcadia-db --bin seed -- --db ./data/arcadia.db
//! ```
//!
//! ## Generated Data
//! - Six consoles across PS5 / XBOX / PC types, base rates $6-$10/hour
//!   (2v2 rates default to 1.5× at creation)
//! - Snack, drink, and accessory products with realistic prices and stock

use std::env;

use arcadia_db::{Database, DbConfig, NewConsole, NewProduct};

/// Console stations for a small lounge floor
const CONSOLES: &[(&str, &str, i64)] = &[
    ("Station 1", "PS5", 800),
    ("Station 2", "PS5", 800),
    ("Station 3", "XBOX", 700),
    ("Station 4", "XBOX", 700),
    ("Rig 1", "PC", 1000),
    ("Rig 2", "PC", 600),
];

/// Retail products: (sku, name, price_cents, stock)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    // Drinks
    ("COLA-330", "Cola 330ml", 250, 48),
    ("SODA-LEM-330", "Lemon Soda 330ml", 250, 36),
    ("WATER-500", "Still Water 500ml", 150, 60),
    ("ENERGY-250", "Energy Drink 250ml", 400, 24),
    ("ICETEA-500", "Iced Tea 500ml", 300, 30),
    // Snacks
    ("CHIPS-SALT", "Salted Chips", 350, 40),
    ("CHIPS-PAPR", "Paprika Chips", 350, 40),
    ("CHOC-BAR", "Chocolate Bar", 200, 50),
    ("GUMMY-MIX", "Gummy Mix", 275, 35),
    ("POPCORN", "Popcorn Bag", 300, 25),
    // Accessories
    ("HEADSET-RENT", "Headset Rental", 500, 12),
    ("CTRL-GRIP", "Controller Grips", 900, 15),
    ("WRIST-PAD", "Wrist Rest Pad", 1200, 8),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let db_path = parse_arg(&args, "--db").unwrap_or_else(|| "./arcadia.db".to_string());

    tracing::info!(db = %db_path, "Seeding database");

    let db = match Database::new(DbConfig::new(&db_path)).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };

    let mut consoles = 0usize;
    for (name, console_type, rate_1v1_cents) in CONSOLES {
        let result = db
            .consoles()
            .insert(NewConsole {
                name: name.to_string(),
                console_type: console_type.to_string(),
                rate_1v1_cents: *rate_1v1_cents,
                rate_2v2_cents: None,
            })
            .await;
        match result {
            Ok(_) => consoles += 1,
            Err(e) => tracing::warn!(name = %name, error = %e, "Skipping console"),
        }
    }

    let mut products = 0usize;
    for (sku, name, price_cents, stock) in PRODUCTS {
        let result = db
            .products()
            .insert(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                price_cents: *price_cents,
                current_stock: *stock,
            })
            .await;
        match result {
            Ok(_) => products += 1,
            // Re-running the seed hits the SKU unique constraint; fine
            Err(e) => tracing::warn!(sku = %sku, error = %e, "Skipping product"),
        }
    }

    tracing::info!(consoles, products, "Seed complete");
    db.close().await;
}

/// Finds the value following a `--flag` argument.
fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
