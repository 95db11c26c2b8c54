//! Extraction of multiframe calls out of larger expressions.
//!
//! After this pass every multiframe call is either a bare call
//! statement or the sole right-hand side of an assignment to a
//! compiler-generated local, so the CFG pass can split it into its
//! pre/post halves. A call in a `while` condition additionally gets a
//! re-evaluating assignment at the end of the loop body.

use crate::BuildError;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::env::Env;
use crate::symbols::SymbolKind;

/// Rewrite every multiframe call under `root`.
pub fn extract_multiframe_calls(
    env: &mut Env,
    ast: &mut Ast,
    root: NodeId,
) -> Result<(), BuildError> {
    let mut worklist = vec![root];

    while let Some(scan_root) = worklist.pop() {
        let calls = find_first_level_calls(env, ast, scan_root);
        for call in calls {
            let produced = extract_one(env, ast, call)?;
            for node in produced {
                for child in ast.children(node) {
                    worklist.push(child);
                }
            }
        }
    }
    Ok(())
}

/// Multiframe calls under `root`, not looking inside other multiframe
/// calls (their arguments are rescanned after extraction).
fn find_first_level_calls(env: &Env, ast: &Ast, root: NodeId) -> Vec<NodeId> {
    let mut calls = Vec::new();
    let table = &env.table;
    ast.visit(root, &mut |ast, id| match &ast.node(id).kind {
        NodeKind::Call { overload, .. } if table.overload(*overload).is_multiframe => {
            calls.push(id);
            true
        }
        _ => false,
    });
    calls
}

/// Pull one call out of its enclosing expression. Returns the nodes
/// whose children still need scanning.
fn extract_one(env: &mut Env, ast: &mut Ast, call: NodeId) -> Result<Vec<NodeId>, BuildError> {
    // walk up to the enclosing block; remember the statement on the
    // path and whether the call sits in a while condition
    let mut instr = call;
    let mut block = ast.node(call).parent;
    let mut enclosing_loop = None;
    loop {
        let Some(current) = block else {
            return Err(BuildError::Ast(
                "multiframe call does not have a block among its parents".to_owned(),
            ));
        };
        match &ast.node(current).kind {
            NodeKind::Block { .. } => break,
            NodeKind::While { condition, .. } if *condition == instr => {
                enclosing_loop = Some(current);
            }
            _ => {}
        }
        instr = current;
        block = ast.node(current).parent;
    }
    let block = block.expect("loop breaks only with a block");

    let mut produced = Vec::new();
    let mut condition_lhs = None;

    if instr != call {
        let scope = match &ast.node(block).kind {
            NodeKind::Block { scope, .. } => scope.ok_or_else(|| {
                BuildError::Ast("statement block without a scope".to_owned())
            })?,
            _ => unreachable!("walk stopped at a block"),
        };

        let return_type = ast
            .ty(call)
            .cloned()
            .ok_or_else(|| BuildError::Ast("multiframe call without a type".to_owned()))?;
        let name = format!("cels_s{}", env.next_internal_id());
        let variable =
            env.table
                .add_symbol(scope, &name, SymbolKind::Variable { ty: return_type.clone() })?;

        let vdecl = ast.add(NodeKind::VDecl { variable }, None);
        let term_l = ast.add(
            NodeKind::SymbolTerm { symbol: variable },
            Some(return_type.clone()),
        );
        let term_r = ast.add(NodeKind::SymbolTerm { symbol: variable }, Some(return_type));

        // Expr(call(x)) becomes: var s; s = call(x); Expr(s)
        ast.replace(call, term_r);
        let assign = ast.add(
            NodeKind::Assign {
                left: term_l,
                right: call,
            },
            None,
        );
        ast.insert_before(instr, vdecl);
        ast.insert_before(instr, assign);

        produced.push(call);
        condition_lhs = Some(term_l);
    } else {
        produced.push(call);
    }

    // while(call) { B; } becomes: s = call; while(s) { B; s = call; }
    if let Some(while_node) = enclosing_loop {
        let lhs = condition_lhs.ok_or_else(|| {
            BuildError::Ast("while condition call extracted without a temporary".to_owned())
        })?;
        let body = match &ast.node(while_node).kind {
            NodeKind::While { body, .. } => *body,
            _ => unreachable!("recorded node is a while"),
        };
        let lhs_copy = ast.clone_subtree(lhs);
        let call_copy = ast.clone_subtree(call);
        let reassign = ast.add(
            NodeKind::Assign {
                left: lhs_copy,
                right: call_copy,
            },
            None,
        );
        ast.push_to_block(body, reassign);
        produced.push(call_copy);
    }

    Ok(produced)
}
