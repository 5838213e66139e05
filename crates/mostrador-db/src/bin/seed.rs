//! # Demo Data Seeder
//!
//! Fills an empty Mostrador database with a small store: catalog, suppliers,
//! clients, company profile and default settings.
//!
//! ## Usage
//! ```bash
//! cargo run -p mostrador-db --bin seed
//! cargo run -p mostrador-db --bin seed -- --db ./data/mostrador.db
//! ```
//!
//! Prices are per unit in cents; purchase price sits at 70-80% of sale
//! price and stock starts between 0 and 60, so a few products show up in
//! the low-stock list straight away.

use chrono::Utc;
use std::env;

use mostrador_core::{Client, Product, Supplier, DEFAULT_TAX_BPS};
use mostrador_db::{CompanyProfileInput, Database, DbConfig};
use mostrador_db::repository::new_id;

/// (code prefix, category, unit, [(description, sale price cents)])
const CATALOG: &[(&str, &str, &str, &[(&str, i64)])] = &[
    (
        "ABA",
        "Abarrotes",
        "pieza",
        &[
            ("Arroz blanco 1kg", 3_250),
            ("Frijol negro 1kg", 4_190),
            ("Azúcar estándar 2kg", 6_400),
            ("Aceite vegetal 1L", 4_850),
            ("Sal de mesa 1kg", 1_590),
            ("Harina de trigo 1kg", 2_700),
            ("Atún en agua 140g", 2_390),
            ("Pasta para sopa 200g", 1_150),
        ],
    ),
    (
        "BEB",
        "Bebidas",
        "pieza",
        &[
            ("Agua natural 1.5L", 1_600),
            ("Refresco de cola 600ml", 1_900),
            ("Jugo de naranja 1L", 3_300),
            ("Café soluble 200g", 11_900),
        ],
    ),
    (
        "LAC",
        "Lácteos",
        "pieza",
        &[
            ("Leche entera 1L", 2_850),
            ("Queso fresco 400g", 7_200),
            ("Crema ácida 200ml", 2_450),
            ("Yogur natural 1kg", 4_600),
        ],
    ),
    (
        "LIM",
        "Limpieza",
        "pieza",
        &[
            ("Detergente en polvo 1kg", 5_400),
            ("Jabón de barra 350g", 2_100),
            ("Cloro 1L", 1_850),
            ("Papel higiénico 4 rollos", 3_990),
        ],
    ),
    (
        "GRA",
        "Granel",
        "kg",
        &[
            ("Chile guajillo", 14_000),
            ("Cacahuate natural", 8_800),
            ("Avena en hojuelas", 3_600),
        ],
    ),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Distribuidora del Bajío", "Ramiro Ortega"),
    ("Lácteos La Vaquita", "Sonia Pérez"),
    ("Comercializadora Limpio", "Jorge Méndez"),
];

const CLIENTS: &[&str] = &["Fonda Doña Rosy", "Taquería El Güero", "Cafetería Central"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./mostrador_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    db_path = path.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mostrador demo data seeder");
                println!();
                println!("Usage: seed [--db <PATH>]");
                println!("  -d, --db <PATH>    Database file (default: ./mostrador_dev.db)");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    println!("Mostrador seed → {}", db_path);

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products; nothing to do.", existing);
        return Ok(());
    }

    let mut seeded = 0;
    for (prefix, category, unit, items) in CATALOG {
        for (index, (description, sale_price_cents)) in items.iter().enumerate() {
            let product = demo_product(prefix, category, unit, description, *sale_price_cents, index);
            match db.products().insert(&product).await {
                Ok(_) => seeded += 1,
                Err(e) => eprintln!("Failed to insert {}: {}", product.code, e),
            }
        }
    }
    println!("  {} products", seeded);

    let now = Utc::now();
    for (name, contact) in SUPPLIERS {
        db.suppliers()
            .insert(&Supplier {
                id: new_id(),
                name: name.to_string(),
                contact_name: Some(contact.to_string()),
                tax_id: None,
                phone: None,
                email: None,
                address: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("  {} suppliers", SUPPLIERS.len());

    for name in CLIENTS {
        db.clients()
            .insert(&Client {
                id: new_id(),
                name: name.to_string(),
                tax_id: None,
                phone: None,
                email: None,
                address: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("  {} clients", CLIENTS.len());

    db.company()
        .upsert(&CompanyProfileInput {
            name: "Abarrotes La Esquina".to_string(),
            address: Some("Av. Juárez 120, Centro".to_string()),
            ..Default::default()
        })
        .await?;

    let tax_percent = DEFAULT_TAX_BPS / 100;
    db.config().set("tax_rate", &tax_percent.to_string()).await?;
    db.config().set("low_stock_threshold", "5").await?;
    db.config().set("currency_symbol", "$").await?;

    let low = db.products().low_stock(5).await?;
    println!("  {} products already at low stock", low.len());
    println!("Seed complete.");

    Ok(())
}

fn demo_product(
    prefix: &str,
    category: &str,
    unit: &str,
    description: &str,
    sale_price_cents: i64,
    index: usize,
) -> Product {
    let now = Utc::now();
    let cost_pct = 70 + (index as i64 * 3) % 11;

    Product {
        id: new_id(),
        code: format!("{}-{:03}", prefix, index + 1),
        description: description.to_string(),
        category: Some(category.to_string()),
        unit: unit.to_string(),
        purchase_price_cents: sale_price_cents * cost_pct / 100,
        sale_price_cents,
        stock: ((index * 17) % 61) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
