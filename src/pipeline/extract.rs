//! Per-page text extraction from PDF bytes.
//!
//! Text is laid out by glyph position with `pdf_extract`, so a line break
//! inside one text object still reaches the scanner as whitespace and fonts
//! with a ToUnicode map decode to real characters. The work is CPU-bound, so
//! the async entry point moves it onto the blocking pool, the same way page
//! rendering is kept off the Tokio workers.
//!
//! Before layout, the `'` and `"` text operators are spelled out as
//! `T*` + `Tj` (with `Tw`/`Tc` for `"`) using lopdf, so every line move is
//! an explicit operator.

use crate::error::GazetteError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info};

/// Plain text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
}

/// Extract the text of every page, in page order.
///
/// # Errors
/// [`GazetteError::DocumentOpen`] when the bytes are not a parseable PDF.
pub async fn extract_pages(bytes: Vec<u8>) -> Result<Vec<PageText>, GazetteError> {
    tokio::task::spawn_blocking(move || extract_pages_blocking(&bytes))
        .await
        .map_err(|e| GazetteError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_pages`].
pub fn extract_pages_blocking(bytes: &[u8]) -> Result<Vec<PageText>, GazetteError> {
    check_magic(bytes)?;

    let prepared = expand_quote_operators(bytes)?;
    let texts = layout_text_by_pages(&prepared)?;
    info!("PDF loaded: {} pages", texts.len());

    let pages = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            debug!("Page {}: {} chars", i + 1, text.chars().count());
            PageText { number: i + 1, text }
        })
        .collect();

    Ok(pages)
}

/// Reject anything that does not start with the `%PDF` header.
fn check_magic(bytes: &[u8]) -> Result<(), GazetteError> {
    match bytes.get(..4) {
        Some(b"%PDF") => Ok(()),
        Some(head) => Err(GazetteError::DocumentOpen {
            detail: format!("missing %PDF header, first bytes: {:?}", head),
        }),
        None => Err(GazetteError::DocumentOpen {
            detail: format!("only {} bytes", bytes.len()),
        }),
    }
}

fn open_error(e: impl std::fmt::Display) -> GazetteError {
    GazetteError::DocumentOpen {
        detail: e.to_string(),
    }
}

/// Rewrite pages that use `'` or `"`; untouched documents are passed through.
fn expand_quote_operators(bytes: &[u8]) -> Result<Cow<'_, [u8]>, GazetteError> {
    let mut document = Document::load_mem(bytes).map_err(open_error)?;
    let mut changed = 0usize;

    for (number, page_id) in document.get_pages() {
        let content = match document.get_and_decode_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                debug!("Page {}: content left as is ({})", number, e);
                continue;
            }
        };
        if !content.operations.iter().any(|op| is_quote_operator(&op.operator)) {
            continue;
        }

        let rewritten = Content {
            operations: spell_out_quotes(content.operations),
        };
        let data = rewritten.encode().map_err(open_error)?;
        document
            .change_page_content(page_id, data)
            .map_err(open_error)?;
        changed += 1;
    }

    if changed == 0 {
        return Ok(Cow::Borrowed(bytes));
    }

    debug!("Spelled out quote operators on {} page(s)", changed);
    let mut buffer = Vec::with_capacity(bytes.len());
    document.save_to(&mut buffer).map_err(open_error)?;
    Ok(Cow::Owned(buffer))
}

fn is_quote_operator(operator: &str) -> bool {
    operator == "'" || operator == "\""
}

/// `string '` becomes `T* string Tj`; `aw ac string "` becomes
/// `aw Tw ac Tc T* string Tj`. Malformed operand lists are kept verbatim.
fn spell_out_quotes(operations: Vec<Operation>) -> Vec<Operation> {
    let mut out = Vec::with_capacity(operations.len());
    for op in operations {
        if op.operator == "'" && op.operands.len() == 1 {
            out.push(Operation::new("T*", vec![]));
            out.push(Operation::new("Tj", op.operands));
        } else if op.operator == "\"" {
            match <[Object; 3]>::try_from(op.operands) {
                Ok([aw, ac, text]) => {
                    out.push(Operation::new("Tw", vec![aw]));
                    out.push(Operation::new("Tc", vec![ac]));
                    out.push(Operation::new("T*", vec![]));
                    out.push(Operation::new("Tj", vec![text]));
                }
                Err(operands) => out.push(Operation {
                    operator: op.operator,
                    operands,
                }),
            }
        } else {
            out.push(op);
        }
    }
    out
}

/// One string per page from `pdf_extract`, which can panic on malformed input.
fn layout_text_by_pages(bytes: &[u8]) -> Result<Vec<String>, GazetteError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(open_error(format!("text extraction failed: {e}"))),
        Err(_) => Err(open_error("text extraction panicked (malformed document)")),
    }
}
