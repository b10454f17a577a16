//! # Demo Snapshot Generator
//!
//! Writes the demo bank to a JSON snapshot that the CLI (or any service
//! built with `store.snapshot_path`) can load.
//!
//! ## Usage
//! ```bash
//! # Write ./qrdesk_dev.json
//! cargo run -p qrdesk-store --bin seed
//!
//! # Custom path and QR prefix
//! cargo run -p qrdesk-store --bin seed -- --out ./data/qrdesk.json --prefix NBL
//! ```

use std::env;
use std::path::PathBuf;

use qrdesk_core::QrStatus;
use qrdesk_store::{Store, StoreConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut out = PathBuf::from("./qrdesk_dev.json");
    let mut prefix = String::from("BNK");
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    out = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--prefix" | "-p" => {
                if i + 1 < args.len() {
                    prefix = args[i + 1].clone();
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("QR Desk Demo Snapshot Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --out <PATH>       Snapshot file (default: ./qrdesk_dev.json)");
                println!("  -p, --prefix <PREFIX>  QR value prefix (default: BNK)");
                println!("  -f, --force            Overwrite an existing snapshot");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("QR Desk Demo Snapshot Generator");
    println!("===============================");
    println!("Snapshot: {}", out.display());
    println!("Prefix:   {}", prefix);
    println!();

    if out.exists() && !force {
        println!("⚠ Snapshot already exists, skipping.");
        println!("  Pass --force to overwrite.");
        return Ok(());
    }

    let store = Store::new(StoreConfig::default().qr_prefix(prefix))?;
    store.save_snapshot(&out).await?;

    let tables = store.snapshot().await;
    let unallocated = store.qr_codes().count_by_status(QrStatus::Unallocated).await;
    println!("✓ Branches:      {}", tables.branches.len());
    println!("✓ Users:         {}", tables.users.len());
    println!("✓ Merchants:     {}", tables.merchants.len());
    println!("✓ QR codes:      {} ({} unallocated)", tables.qr_codes.len(), unallocated);
    println!("✓ Audit items:   {}", tables.audit_items.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
