use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::parser;
use crate::preprocess;
use crate::recognizer::{OcrBackend, OcrError};
use crate::totals;
use crate::types::ParsedItem;
use crate::validate;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image preprocessing failed: {0}")]
    Preprocess(#[from] preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The outcome of scanning raw receipt text: whatever items survived
/// parsing, the printed total if one was labeled, and whether the two
/// reconcile. A partial item list is a success, not a degraded failure.
#[derive(Debug, Clone)]
pub struct TextScan {
    pub items: Vec<ParsedItem>,
    pub expected_total: Option<Decimal>,
    pub validated: bool,
}

/// Parse and reconcile already-extracted receipt text. Bookkeeping lines
/// (total, subtotal, tax, tip) are kept out of the item list; the labeled
/// total is still read from them for reconciliation.
pub fn scan_text(text: &str) -> TextScan {
    let expected_total = totals::expected_total(text);
    let body: Vec<&str> = text
        .lines()
        .filter(|line| !totals::is_summary_line(line))
        .collect();
    let items = parser::parse_receipt(&body.join("\n"));
    let validated = validate::validate_items(&items, expected_total);
    tracing::debug!(
        items = items.len(),
        expected_total = ?expected_total,
        validated,
        "receipt text scanned"
    );
    TextScan { items, expected_total, validated }
}

/// The result of one full receipt processing run.
#[derive(Debug)]
pub struct ScanResult {
    /// SHA-256 hex digest of the original capture — the content-addressed key.
    pub hash_hex: String,
    /// Where the original file landed in the attachments tree.
    pub attachment_path: PathBuf,
    /// Raw OCR text output.
    pub ocr_text: String,
    pub items: Vec<ParsedItem>,
    pub expected_total: Option<Decimal>,
    pub validated: bool,
}

/// Orchestrates: hash → content-store → preprocess → OCR → parse → validate.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    attachments_dir: PathBuf,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, attachments_dir: PathBuf) -> Self {
        Self { recognizer, attachments_dir }
    }

    /// Process a captured image on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        self.process_bytes(&bytes, &ext).await
    }

    /// Process raw capture bytes (camera or file read).
    pub async fn process_bytes(&self, data: &[u8], ext: &str) -> Result<ScanResult, PipelineError> {
        let hash_hex = sha256_hex(data);

        // Keep the original capture in the content-addressed store; the same
        // photo always lands on the same path.
        let dest = attachment_path(&self.attachments_dir, &hash_hex, ext);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, data).await?;

        let image_bytes = preprocess::prepare_for_ocr_from_bytes(data)?;
        let ocr_text = self.recognizer.recognize(&image_bytes)?;
        tracing::debug!(hash = %hash_hex, chars = ocr_text.len(), "receipt recognized");

        let TextScan { items, expected_total, validated } = scan_text(&ocr_text);

        Ok(ScanResult {
            hash_hex,
            attachment_path: dest,
            ocr_text,
            items,
            expected_total,
            validated,
        })
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Attachment layout: `<base>/<first two hex chars>/<full hex>.<ext>`.
fn attachment_path(base: &Path, hash_hex: &str, ext: &str) -> PathBuf {
    base.join(&hash_hex[..2]).join(format!("{hash_hex}.{ext}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
