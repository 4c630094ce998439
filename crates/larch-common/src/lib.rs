//! Shared leaf types for the Larch compiler.
//!
//! The front end (lexer, parser, renamer) and the type checker both speak
//! in byte-offset spans into the original source text. This crate holds
//! those types so the two sides agree without depending on each other.

pub mod span;

pub use span::{LineIndex, Position, Span};
