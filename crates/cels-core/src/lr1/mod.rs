//! Canonical LR(1): item sets, analysis table, persistence and the
//! shift/reduce driver.
//!
//! The first rule of the grammar plays the role of the augmented start
//! production: the table accepts on `[start -> ... •, $]`. Non-terminal
//! columns reuse shift entries as GOTO entries, which is also how the
//! on-disk format encodes them.

mod collection;
mod driver;
mod table;

#[cfg(test)]
mod driver_tests;
#[cfg(test)]
mod table_tests;

pub use driver::{Lr1Parser, Lr1Token};
pub use table::{Action, AnalysisTable, Column};

use crate::grammar::Lookahead;

/// An LR(1) item: a rule, a dot position and a single lookahead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Item {
    pub rule: usize,
    pub dot: usize,
    pub lookahead: Lookahead,
}
