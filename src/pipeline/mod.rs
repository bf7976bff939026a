//! Pipeline stages for one gazette watch run.
//!
//! Each submodule implements exactly one step, so every stage can be tested
//! on its own and a strategy (e.g. how the link is found) can change without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! resolve ──▶ fetch ──▶ extract ──▶ scan ──▶ notify
//! (page URL)  (bytes)   (pages)     (hits)   (e-mail)
//! ```
//!
//! 1. [`resolve`]: find the current edition's PDF link (DOM, regex, or
//!    [`browser`] when the `browser` feature is on)
//! 2. [`fetch`]:   download to a transient file that removes itself on drop
//! 3. [`extract`]: per-page laid-out text via pdf-extract, off the async workers
//! 4. [`scan`]:    whitespace/case-insensitive phrase search with context
//! 5. [`notify`]:  compose the summary, attach the PDF, send over SMTP

#[cfg(feature = "browser")]
pub mod browser;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod resolve;
pub mod scan;
