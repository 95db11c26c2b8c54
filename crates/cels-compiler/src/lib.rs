//! Celesta compiler: lexing, parsing, semantic analysis and C++ emission.
//!
//! The pipeline, in crate-module order:
//! - `tokens` - the surface token table and the Celesta lexer
//! - `symbols` - hierarchical scopes, symbols, the data type algebra
//! - `operators` - binary/unary operator, converter and indexer tables
//! - `env` - the compilation environment and its default registrations
//! - `ast` - the typed AST arena
//! - `build` - the grammar and its semantic actions
//! - `multiframe` - lowering of multiframe functions to state machines
//! - `emit` - C++ emission with dependency-ordered declarations
//!
//! `Compiler` in `compiler` ties the stages together.

pub mod ast;
pub mod build;
pub mod compiler;
pub mod emit;
pub mod env;
pub mod multiframe;
pub mod operators;
pub mod symbols;
pub mod tokens;

#[cfg(test)]
pub mod test_utils;
#[cfg(test)]
mod tokens_tests;

pub use compiler::Compiler;
pub use env::Env;

/// Scope and symbol lookup failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    #[error("duplicate symbol: {name} under {scope}")]
    DuplicateSymbol { name: String, scope: String },

    #[error("scope does not exist: {0}")]
    MissingScope(String),

    #[error("scope already exists: {0}")]
    ScopeExists(String),

    #[error("duplicate scope definition: {0}")]
    DuplicateScope(String),

    #[error("symbol could not be identified: {name} under {scope}")]
    UnknownSymbol { name: String, scope: String },

    #[error("ambiguous symbol {name}. Found matches: {matches}")]
    AmbiguousSymbol { name: String, matches: String },
}

/// Type-level failures raised while building the AST.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("no definition for operator {symbol}({left}, {right})")]
    NoBinaryOperator {
        symbol: String,
        left: String,
        right: String,
    },

    #[error("no definition for {fixity} operator {symbol}({operand})")]
    NoUnaryOperator {
        symbol: String,
        fixity: String,
        operand: String,
    },

    #[error("could not convert {from} to {to}")]
    NoConverter { from: String, to: String },

    #[error("no indexer found for {element}[{key}]")]
    NoIndexer { element: String, key: String },

    #[error("object of type {0} is not callable")]
    NotCallable(String),

    #[error("no match for calling {function} with argument types ({args})")]
    NoOverload { function: String, args: String },

    #[error("ambiguous call for {function} with types ({args}). Possible matches: {matches}")]
    AmbiguousOverload {
        function: String,
        args: String,
        matches: String,
    },

    #[error("operator {symbol}({left}, {right}) is already defined")]
    DuplicateBinaryOperator {
        symbol: String,
        left: String,
        right: String,
    },

    #[error("{fixity} operator {symbol}({operand}) is already defined")]
    DuplicateUnaryOperator {
        symbol: String,
        fixity: String,
        operand: String,
    },

    #[error("converter from {from} to {to} already exists")]
    DuplicateConverter { from: String, to: String },

    #[error("function overload already exists: {0}")]
    DuplicateOverload(String),

    #[error("dereference operator called on non-pointer")]
    DerefNonPointer,

    #[error("struct type expected, got {0}")]
    StructExpected(String),

    #[error("{0}")]
    Other(String),
}

/// Semantic failures raised by the AST builder that are not type errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("{0}")]
    Ast(String),
}

/// Failures while emitting C++.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    #[error("circular dependency between declarations: {0}")]
    DependencyCycle(String),

    #[error("multiframe lowering failed for {overload}: {message}")]
    Multiframe { overload: String, message: String },

    #[error("{0}")]
    Internal(String),
}

/// Any compilation failure, stage by stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Regex(#[from] cels_core::RegexError),

    #[error(transparent)]
    Lex(#[from] cels_core::LexError),

    #[error(transparent)]
    Grammar(#[from] cels_core::GrammarError),

    #[error(transparent)]
    Parse(#[from] cels_core::ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Result alias for whole-pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
