//! Shared helpers for the crate's test modules.
//!
//! Building the LR(1) table is the expensive part of parser
//! construction, so every test shares one parser instance.

use std::sync::OnceLock;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::build::CelsParser;
use crate::env::Env;

static PARSER: OnceLock<CelsParser> = OnceLock::new();

pub fn parser() -> &'static CelsParser {
    PARSER.get_or_init(|| CelsParser::new().expect("the grammar is conflict-free"))
}

/// Parse one source into a fresh default environment.
pub fn parse(text: &str) -> (Env, Ast, NodeId) {
    let mut env = Env::default_env();
    let mut ast = Ast::new();
    let (root, _) = parser()
        .parse_source(&mut env, &mut ast, text)
        .expect("test source parses");
    (env, ast, root)
}

/// Parse a source expected to fail, returning the error.
pub fn parse_err(text: &str) -> crate::Error {
    let mut env = Env::default_env();
    let mut ast = Ast::new();
    parser()
        .parse_source(&mut env, &mut ast, text)
        .expect_err("test source must fail")
}

/// First node under `root` (depth-first) matching the predicate.
pub fn find_node(
    ast: &Ast,
    root: NodeId,
    pred: impl Fn(&NodeKind) -> bool,
) -> Option<NodeId> {
    let mut found = None;
    ast.visit(root, &mut |ast, id| {
        if found.is_none() && pred(&ast.node(id).kind) {
            found = Some(id);
        }
        false
    });
    found
}

/// All nodes under `root` matching the predicate, in visit order.
pub fn find_nodes(
    ast: &Ast,
    root: NodeId,
    pred: impl Fn(&NodeKind) -> bool,
) -> Vec<NodeId> {
    let mut found = Vec::new();
    ast.visit(root, &mut |ast, id| {
        if pred(&ast.node(id).kind) {
            found.push(id);
        }
        false
    });
    found
}
