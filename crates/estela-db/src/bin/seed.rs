//! # Seed Data Generator
//!
//! Populates a database with demo salon data and prints a reconciliation of
//! the last week as JSON.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file
//! cargo run -p estela-db --bin seed
//!
//! # Specify database path
//! cargo run -p estela-db --bin seed -- --db ./data/estela.db
//! ```
//!
//! ## Generated Data
//! - A three-stylist roster with distinct commission rates
//! - A catalog of services and retail products
//! - Checked-out appointments covering all payment methods and both
//!   tender currencies
//! - A partially repaid loan, internal usage, and a restock purchase

use std::env;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use estela_core::money::{Currency, Money};
use estela_core::types::{
    Appointment, AppointmentStatus, CatalogItem, ItemKind, PaymentMethod, Stylist,
};
use estela_core::{Checkout, PaymentDetails};
use estela_db::{Database, DbConfig};

const STYLISTS: &[(&str, u32)] = &[
    ("Marisol Vega", 3500),
    ("Alicia Campos", 3000),
    ("Renata Luna", 4000),
];

/// (name, kind, sale price cents, purchase cost cents, stock)
const CATALOG: &[(&str, ItemKind, i64, i64, Option<i64>)] = &[
    ("Corte Dama", ItemKind::Service, 35000, 0, None),
    ("Corte Caballero", ItemKind::Service, 25000, 0, None),
    ("Tinte Completo", ItemKind::Service, 100_000, 0, None),
    ("Peinado Evento", ItemKind::Service, 60000, 0, None),
    ("Cera Mate", ItemKind::Product, 15000, 7000, Some(10)),
    ("Shampoo Reparador", ItemKind::Product, 28000, 11000, Some(8)),
    ("Ampolleta Keratina", ItemKind::Product, 9000, 4000, Some(2)),
    ("Spray Fijador", ItemKind::Product, 12000, 5000, Some(15)),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let db_path = parse_db_path();
    println!("Seeding {db_path} ...");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let stylist_ids = seed_stylists(&db).await?;
    let items = seed_catalog(&db).await?;
    seed_sales(&db, &stylist_ids, &items).await?;
    seed_movements(&db, &stylist_ids, &items).await?;

    // Reconcile the last week and show what the reporting UI would receive.
    let today = Utc::now().date_naive();
    let bundle = db.reports().reconcile(today - Duration::days(7), today).await;
    println!("{}", serde_json::to_string_pretty(&bundle)?);

    println!("Done.");
    Ok(())
}

fn parse_db_path() -> String {
    let args: Vec<String> = env::args().collect();
    let mut path = "./estela.db".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                path = args[i + 1].clone();
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: seed [--db <path>]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    path
}

async fn seed_stylists(db: &Database) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut ids = Vec::new();
    for (name, bps) in STYLISTS {
        let stylist = Stylist {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            commission_bps: *bps,
            is_active: true,
            created_at: Utc::now(),
        };
        db.stylists().insert(&stylist).await?;
        ids.push(stylist.id);
    }
    println!("  {} stylists", ids.len());
    Ok(ids)
}

async fn seed_catalog(db: &Database) -> Result<Vec<CatalogItem>, Box<dyn std::error::Error>> {
    let mut items = Vec::new();
    let now = Utc::now();
    for (name, kind, price, cost, stock) in CATALOG {
        let item = CatalogItem {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            kind: *kind,
            sale_price_cents: *price,
            purchase_cost_cents: *cost,
            current_stock: *stock,
            minimum_stock: stock.map(|_| 3),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert(&item).await?;
        items.push(item);
    }
    println!("  {} catalog items", items.len());
    Ok(items)
}

/// Runs a handful of checkouts end to end: appointment -> cart -> finalize
/// -> record, mixing payment methods and tender currencies.
async fn seed_sales(
    db: &Database,
    stylist_ids: &[String],
    items: &[CatalogItem],
) -> Result<(), Box<dyn std::error::Error>> {
    let rate = db.settings().exchange_rate().await?;
    let services: Vec<&CatalogItem> = items.iter().filter(|i| i.kind == ItemKind::Service).collect();
    let products: Vec<&CatalogItem> = items.iter().filter(|i| i.kind == ItemKind::Product).collect();

    let plans: &[(usize, usize, Option<usize>, PaymentMethod, Currency)] = &[
        (0, 0, Some(0), PaymentMethod::Cash, Currency::Mxn),
        (1, 2, None, PaymentMethod::Card, Currency::Mxn),
        (2, 3, Some(3), PaymentMethod::Cash, Currency::Usd),
        (0, 1, None, PaymentMethod::Transfer, Currency::Mxn),
    ];

    for (stylist_idx, service_idx, product_idx, method, tender) in plans {
        let service = services[*service_idx];
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            stylist_id: stylist_ids[*stylist_idx].clone(),
            client_id: Uuid::new_v4().to_string(),
            service_id: service.id.clone(),
            booked_price_cents: None,
            status: AppointmentStatus::Scheduled,
            starts_at: Utc::now(),
            created_at: Utc::now(),
        };
        db.appointments().insert(&appointment).await?;

        let mut checkout = Checkout::for_appointment(&appointment, service);
        if let Some(p) = product_idx {
            checkout.add_line(products[*p], 1, None)?;
        }

        let totals = checkout.totals(rate);
        let due = totals.due_in(*tender);
        let finalized = checkout.finalize(
            rate,
            PaymentDetails {
                method: *method,
                // Tender a round note above the due amount
                tendered: Money::from_cents(((due.cents() / 10000) + 1) * 10000),
                tender_currency: *tender,
                change_currency: Currency::Mxn,
            },
        )?;
        db.sales().record(&finalized).await?;
    }

    println!("  {} sales", plans.len());
    Ok(())
}

async fn seed_movements(
    db: &Database,
    stylist_ids: &[String],
    items: &[CatalogItem],
) -> Result<(), Box<dyn std::error::Error>> {
    let first_product = items
        .iter()
        .find(|i| i.kind == ItemKind::Product)
        .expect("catalog seeds include products");

    // A vale with one payment already applied
    let loan = db
        .loans()
        .create(
            &stylist_ids[0],
            Money::from_cents(50000),
            due_in_days(30),
            Some("adelanto de quincena".to_string()),
        )
        .await?;
    db.loans().record_payment(&loan.id, Money::from_cents(20000)).await?;

    // Product consumed at a chair, and a restock delivery
    db.inventory()
        .record_usage(&first_product.id, Some(&stylist_ids[1]), 1)
        .await?;
    db.inventory()
        .record_purchase(&first_product.id, 6, first_product.cost())
        .await?;

    println!("  1 loan, 1 usage, 1 purchase");
    Ok(())
}

fn due_in_days(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}
