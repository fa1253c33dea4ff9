//! Demo seed script
//!
//! Provisions:
//! - the observer account: a public demo identity with CMS admin rights
//!   (logs in via /cms/login) so it can reach the admin surface, where the
//!   observer guard blocks it from touching the curated content
//! - a regular CMS admin account
//! - curated example assets in all four narrative tables (the protected set)
//!
//! Prints the observer account id and the protected asset ids to copy into
//! `OBSERVER_ACCOUNT_ID` / `PROTECTED_ASSET_IDS`.
//!
//! Usage:
//!   DATABASE_URL=... ./seed [--observer-password PW] [--admin-email EMAIL] [--admin-password PW]

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

use fabula_api::db;

#[derive(Parser)]
#[command(name = "seed", about = "Seed the Fabula database with demo content")]
struct Args {
    /// Password for the observer demo account
    #[arg(long, default_value = "Observer2024!")]
    observer_password: String,

    /// Email for the CMS admin account
    #[arg(long, default_value = "admin@fabula.example")]
    admin_email: String,

    /// Password for the CMS admin account
    #[arg(long, default_value = "Admin2024!")]
    admin_password: String,
}

const CURATED_ASSETS: &[(&str, &str, &str)] = &[
    ("acts", "Act I — The Lighthouse", "Opening act of the demo story"),
    ("scenes", "The Cellar Door", "First explorable scene"),
    ("characters", "The Keeper", "Narrator of the demo story"),
    ("sceneries", "Stormy Coastline", "Backdrop for Act I"),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    println!("=== Seed Fabula demo content ===");

    // Admin rights on purpose: asset writes are admin-gated, so the demo
    // identity must pass the role check for the observer guard to be the
    // thing that stops it.
    let observer_hash = bcrypt::hash(&args.observer_password, 12)?;
    let observer_id: Uuid = sqlx::query_scalar(
        "INSERT INTO accounts (email, password_hash, name, surname, is_admin)
         VALUES ('observer@fabula.example', $1, 'Observer', 'Demo', TRUE)
         ON CONFLICT (email, is_admin)
         DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
         RETURNING id",
    )
    .bind(&observer_hash)
    .fetch_one(&pool)
    .await?;
    println!("Observer account (CMS login): observer@fabula.example (id {observer_id})");

    let admin_hash = bcrypt::hash(&args.admin_password, 12)?;
    let admin_id: Uuid = sqlx::query_scalar(
        "INSERT INTO accounts (email, password_hash, name, surname, is_admin)
         VALUES ($1, $2, 'Fabula', 'Admin', TRUE)
         ON CONFLICT (email, is_admin)
         DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
         RETURNING id",
    )
    .bind(&args.admin_email)
    .bind(&admin_hash)
    .fetch_one(&pool)
    .await?;
    println!("CMS admin account: {} (id {admin_id})", args.admin_email);

    let mut protected_ids = Vec::new();
    for (table, name, description) in CURATED_ASSETS {
        let id: Uuid = sqlx::query_scalar(&format!(
            "INSERT INTO {table} (name, description) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
             RETURNING id"
        ))
        .bind(name)
        .bind(description)
        .fetch_one(&pool)
        .await?;
        println!("Curated {table}: {name} (id {id})");
        protected_ids.push(id.to_string());
    }

    println!();
    println!("Add to your environment:");
    println!("OBSERVER_ACCOUNT_ID={observer_id}");
    println!("PROTECTED_ASSET_IDS={}", protected_ids.join(","));

    Ok(())
}
