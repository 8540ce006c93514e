//! Pipeline stages for PDF-to-flashcard generation.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the PDF engine or the model can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ normalize
//! (base64)  (engine)    (chat)  (shape + count)
//! ```
//!
//! 1. [`input`]: decode the base64 upload, enforce the size limit,
//!    check the `%PDF` signature
//! 2. [`extract`]: read page text under a page cap and timeouts, through
//!    the [`engine`] traits
//! 3. [`llm`]: compose the request and make the single completion call;
//!    the only stage with network I/O
//! 4. [`normalize`]: validate the reply shape and apply the count policy

pub mod engine;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
