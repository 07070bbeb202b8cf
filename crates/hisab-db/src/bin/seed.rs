//! # Seed Data Generator
//!
//! Populates a development database with units, products and money
//! accounts so the engine can be exercised by hand.
//!
//! ## Usage
//! ```bash
//! # Seed ./hisab_dev.db with default opening balances
//! cargo run -p hisab-db --bin seed
//!
//! # Specify database path and safe opening balance (major units)
//! cargo run -p hisab-db --bin seed -- --db ./data/hisab.db --opening 5000
//! ```
//!
//! ## Generated Data
//! - Units: piece, pack, carton, kg
//! - Products across a few trading categories, each with pack/carton factors
//! - Money accounts: Main Cashier, Main Safe, Saraf float

use chrono::Utc;
use std::env;
use uuid::Uuid;

use hisab_core::{Account, AccountType, Money, Product, ProductUnit, Unit, DEFAULT_CURRENCY};
use hisab_db::{Database, DbConfig};

/// Units of measure. `(id, name)`.
const UNITS: &[(&str, &str)] = &[
    ("piece", "Piece"),
    ("pack", "Pack"),
    ("carton", "Carton"),
    ("kg", "Kilogram"),
];

/// `(name, base unit, tracks batches, pack factor, carton factor)`
const PRODUCTS: &[(&str, &str, bool, i64, i64)] = &[
    ("Cooking Oil 1L", "piece", true, 6, 12),
    ("Basmati Rice 5kg", "piece", false, 4, 8),
    ("Green Tea 100g", "piece", true, 10, 40),
    ("Sugar 1kg", "piece", false, 10, 20),
    ("Paracetamol 500mg Strip", "piece", true, 10, 100),
    ("Detergent Powder 1kg", "piece", false, 6, 24),
    ("Tomato Paste 400g", "piece", true, 12, 48),
    ("Mineral Water 1.5L", "piece", false, 6, 12),
];

/// `(name, type, opening balance in major units)`
const MONEY_ACCOUNTS: &[(&str, AccountType, i64)] = &[
    ("Main Cashier", AccountType::Cashier, 0),
    ("Main Safe", AccountType::Safe, 1000),
    ("Saraf Float", AccountType::Saraf, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./hisab_dev.db");
    let mut safe_opening: Option<i64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--opening" | "-o" => {
                if i + 1 < args.len() {
                    safe_opening = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Hisab Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./hisab_dev.db)");
                println!("  -o, --opening <AMOUNT> Main Safe opening balance in major units (default: 1000)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Hisab Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let mut uow = db.unit_of_work().await?;

    for (id, name) in UNITS {
        uow.products()
            .insert_unit(&Unit {
                id: id.to_string(),
                name: name.to_string(),
                is_deleted: false,
            })
            .await?;
    }
    println!("✓ {} units", UNITS.len());

    for (name, base_unit, tracks_batches, pack, carton) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            base_unit_id: base_unit.to_string(),
            tracks_batches: *tracks_batches,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        uow.products().insert(&product).await?;

        for (unit_id, factor) in [("pack", *pack), ("carton", *carton)] {
            uow.products()
                .set_factor(&ProductUnit {
                    product_id: product.id.clone(),
                    unit_id: unit_id.to_string(),
                    factor,
                })
                .await?;
        }
    }
    println!("✓ {} products", PRODUCTS.len());

    for (name, account_type, opening) in MONEY_ACCOUNTS {
        let opening = match account_type {
            AccountType::Safe => safe_opening.unwrap_or(*opening),
            _ => *opening,
        };
        let opening = Money::from_major_minor(opening, 0);
        uow.accounts()
            .insert(&Account {
                id: Uuid::new_v4().to_string(),
                account_type: *account_type,
                ref_id: None,
                name: name.to_string(),
                opening_balance_cents: opening.cents(),
                current_balance_cents: opening.cents(),
                currency: DEFAULT_CURRENCY.to_string(),
                is_deleted: false,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await?;
        println!("  {} ({}): {} {}", name, account_type.as_str(), opening, DEFAULT_CURRENCY);
    }

    uow.commit().await?;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
