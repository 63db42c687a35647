//! # quire_parser
//!
//! Processor abstraction layer for quire.
//!
//! This crate provides:
//! - A `Processor` trait turning text into a tree and back
//! - The built-in Markdown processor using `markdown-rs`
//!
//! ## Example
//!
//! ```rust
//! use quire_parser::{MarkdownProcessor, Processor, Settings};
//!
//! let processor = MarkdownProcessor::new();
//! let settings = Settings::new();
//! let source = "# Hello\n\nThis is a paragraph.\n";
//!
//! let tree = processor.parse(source, &settings).unwrap();
//! assert_eq!(processor.stringify(&tree, &settings).unwrap(), source);
//! ```

mod error;
mod markdown;
mod stringify;
mod traits;

pub use error::ParseError;
pub use markdown::MarkdownProcessor;
pub use traits::{Processor, Settings};
