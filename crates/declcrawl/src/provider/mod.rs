//! The syntax-tree provider boundary.
//!
//! The crawler consumes clang only through [`cursor::Cursor`]; the adapter in
//! [`compiler`] shells out to the real front end and [`clang`] deserializes
//! its JSON AST dump.

pub mod clang;
pub mod compiler;
pub mod cursor;

pub use compiler::{ClangDriver, CrawlOutput, CrawlRequest, MacroDef, ProviderError};
pub use cursor::{Cursor, CursorKind, Diagnostic, Severity, SourceLoc, SourceSpan};
