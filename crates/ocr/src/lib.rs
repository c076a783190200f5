pub mod parser;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod totals;
pub mod types;
pub mod validate;

pub use parser::{parse_line, parse_receipt};
pub use pipeline::{scan_text, PipelineError, ReceiptPipeline, ScanResult, TextScan};
pub use preprocess::{prepare_for_ocr, prepare_for_ocr_from_bytes, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::ParsedItem;
pub use validate::validate_items;
