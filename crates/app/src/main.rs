use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use divvy_core::{AppConfig, Bill, BillId, Item};
use divvy_ocr::{scan_text, TextScan};
use divvy_storage::DbPool;

fn print_usage() {
    eprintln!(
        "usage: divvy <command>\n\n\
         commands:\n\
         \x20 scan <image>       process a receipt photo (needs the `tesseract` feature)\n\
         \x20 parse <text-file>  parse already-extracted receipt text\n\
         \x20 history            list saved bills\n\
         \x20 show <bill-id>     print a saved bill with per-diner summaries\n\
         \x20 export <bill-id>   write a bill's JSON record to the export folder\n\
         \x20 delete <bill-id>   remove a saved bill\n\
         \x20 backup [path]      archive the database"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    let project_dirs = directories::ProjectDirs::from("app", "divvy", "Divvy")
        .context("could not resolve a home directory")?;
    let config = AppConfig::load(&project_dirs.config_dir().join("divvy.toml"))?;
    let data_dir = config
        .data_dir
        .clone()
        .unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
    std::fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join("bills.db");
    let db = divvy_storage::create_db(&db_path).await?;

    match command.as_str() {
        "scan" => scan(&db, &config, &data_dir, arg(&args, 1, "image path")?).await,
        "parse" => parse(&db, &config, arg(&args, 1, "text file")?).await,
        "history" => history(&db).await,
        "show" => show(&db, arg(&args, 1, "bill id")?).await,
        "export" => export(&db, &data_dir, arg(&args, 1, "bill id")?).await,
        "delete" => delete(&db, arg(&args, 1, "bill id")?).await,
        "backup" => backup(&db, &db_path, &data_dir, args.get(1).map(String::as_str)).await,
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing argument: {what}"))
}

// ── Commands ─────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
async fn scan(db: &DbPool, config: &AppConfig, data_dir: &Path, image: &str) -> Result<()> {
    use divvy_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    use divvy_ocr::ReceiptPipeline;

    let recognizer = TesseractRecognizer::new(None, config.ocr.clone());
    let pipeline = ReceiptPipeline::new(recognizer, data_dir.join("attachments"));
    let result = pipeline.process_file(Path::new(image)).await?;

    tracing::info!(hash = %result.hash_hex, "receipt processed");
    let scan = TextScan {
        items: result.items,
        expected_total: result.expected_total,
        validated: result.validated,
    };
    store_scan(db, config, scan).await
}

#[cfg(not(feature = "tesseract"))]
async fn scan(_db: &DbPool, _config: &AppConfig, _data_dir: &Path, _image: &str) -> Result<()> {
    bail!("scan needs a build with the `tesseract` feature; use `parse` on extracted text instead")
}

async fn parse(db: &DbPool, config: &AppConfig, text_file: &str) -> Result<()> {
    let text = tokio::fs::read_to_string(text_file)
        .await
        .with_context(|| format!("could not read {text_file}"))?;
    store_scan(db, config, scan_text(&text)).await
}

async fn store_scan(db: &DbPool, config: &AppConfig, scan: TextScan) -> Result<()> {
    if scan.items.is_empty() {
        bail!("no items could be parsed from the receipt");
    }
    if !scan.validated {
        eprintln!("warning: parsed items do not reconcile with the printed total");
    }

    let items: Vec<Item> = scan.items.into_iter().map(Item::from).collect();
    let bill = Bill::new(Utc::now(), items, vec![], config.default_tip_percentage);
    divvy_storage::save_bill(db, &bill).await?;
    tracing::info!(bill = %bill.id, items = bill.items().len(), "bill stored");

    println!("{}", divvy_export::bill_text_summary(&bill));
    println!("saved as {}", bill.id);
    Ok(())
}

async fn history(db: &DbPool) -> Result<()> {
    let rows = divvy_storage::list_bills(db).await?;
    if rows.is_empty() {
        println!("no saved bills");
        return Ok(());
    }
    for row in rows {
        println!(
            "{}  {}  {}  ({} items, {} diners)",
            row.id,
            row.date.format("%Y-%m-%d %H:%M"),
            row.total,
            row.item_count,
            row.diner_count,
        );
    }
    Ok(())
}

async fn show(db: &DbPool, id: &str) -> Result<()> {
    let bill = load_bill(db, id).await?;
    println!("{}", divvy_export::bill_text_summary(&bill));
    for diner in bill.diners() {
        println!("{}", divvy_export::diner_text_summary(&bill, diner.id)?);
    }
    Ok(())
}

async fn export(db: &DbPool, data_dir: &Path, id: &str) -> Result<()> {
    let bill = load_bill(db, id).await?;
    let path = divvy_export::export_json_file(&bill, &data_dir.join("exports"))?;
    println!("exported to {}", path.display());
    Ok(())
}

async fn delete(db: &DbPool, id: &str) -> Result<()> {
    let bill_id = parse_bill_id(id)?;
    if divvy_storage::delete_bill(db, bill_id).await? {
        println!("deleted {bill_id}");
    } else {
        println!("no bill with id {bill_id}");
    }
    Ok(())
}

async fn backup(db: &DbPool, db_path: &Path, data_dir: &Path, target: Option<&str>) -> Result<()> {
    let target = match target {
        Some(path) => PathBuf::from(path),
        None => data_dir
            .join("backups")
            .join(format!("bills-{}.tar.gz", Utc::now().format("%Y%m%d_%H%M%S"))),
    };
    divvy_storage::backup_database(db, db_path, &target).await?;
    println!("backup written to {}", target.display());
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn parse_bill_id(raw: &str) -> Result<BillId> {
    BillId::from_str(raw).with_context(|| format!("'{raw}' is not a valid bill id"))
}

async fn load_bill(db: &DbPool, id: &str) -> Result<Bill> {
    let bill_id = parse_bill_id(id)?;
    divvy_storage::get_bill(db, bill_id)
        .await?
        .with_context(|| format!("no bill with id {bill_id}"))
}
