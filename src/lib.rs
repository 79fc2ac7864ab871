//! A small JIT-capable compiler for a Kaleidoscope-style numeric language.
//!
//! The language has one value type, a double-precision number, and a tiny
//! surface: function definitions, externs, if/then/else, for loops, mutable
//! `var` bindings and user-defined unary and binary operators with declared
//! precedence. A program is a sequence of top-level forms:
//!
//! ``` text
//! def fib(x) if x < 3 then 1 else fib(x - 1) + fib(x - 2);
//! fib(10);
//! ```

//! # Pipeline
//!
//! Characters flow through the [`lexer`] into tokens, the [`parser`] builds
//! the [`ast`], and the [`codegen`] walker lowers each top-level form to
//! linear IR through an abstract builder surface, implemented in-crate by
//! [`ir`]. The [`driver`] ties it together the way a JIT does: one form at a
//! time, each into a fresh module that is handed to the execution engine
//! right away.

//! # The grammar moves under you
//!
//! `def binary% 5 (a b) ...` does not just define a function named
//! `binary%`; emitting it inserts `%` with precedence 5 into the
//! [`session`]'s operator table, and the very next form can write `x % y`.
//! Parsing and codegen are interleaved per form precisely so that this
//! works. The same session also owns the prototype registry that re-declares
//! functions into fresh modules after the engine took away the module that
//! defined them.

pub mod ast;
pub mod cli;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod session;

pub use driver::Kaleido;
pub use error::KaleidoError;
