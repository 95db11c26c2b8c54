//! Linear path collapsing inside one functional component.
//!
//! Two adjacent instruction nodes merge when the edge between them is
//! the only one on either side and both carry code. Merging never
//! crosses a conditional, a jump, a suspension boundary (those ended
//! the component already) or a join point.

use std::collections::HashMap;

use crate::ast::{Ast, NodeId, NodeKind};

use super::cfg::{Cfg, CfgKind, CfgNodeId};

pub fn collapse_linear_paths(cfg: &mut Cfg, ast: &mut Ast, head: CfgNodeId) -> Result<(), String> {
    let nodes = cfg.reachable_from(head);

    let mut predecessors: HashMap<CfgNodeId, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    for &node in &nodes {
        for &next in &cfg.node(node).next {
            *predecessors.entry(next).or_insert(0) += 1;
        }
    }

    for &node in &nodes {
        if cfg.node(node).kind == CfgKind::Instr && cfg.node(node).next.len() > 1 {
            return Err(format!(
                "instruction node with {} successors before collapse",
                cfg.node(node).next.len()
            ));
        }
    }

    loop {
        let pairs = mergeable_pairs(cfg, head, &predecessors);
        if pairs.is_empty() {
            return Ok(());
        }
        for (first, second) in pairs {
            let first_ast = cfg.node(first).ast.expect("pair members carry code");
            let second_ast = cfg.node(second).ast.expect("pair members carry code");
            let merged = merge_statements(ast, first_ast, second_ast);
            cfg.node_mut(first).ast = Some(merged);
            let next = cfg.node(second).next.clone();
            cfg.node_mut(first).next = next;
        }
    }
}

fn mergeable_pairs(
    cfg: &Cfg,
    head: CfgNodeId,
    predecessors: &HashMap<CfgNodeId, usize>,
) -> Vec<(CfgNodeId, CfgNodeId)> {
    let mut pairs = Vec::new();
    let mut claimed: Vec<CfgNodeId> = Vec::new();

    for node in cfg.reachable_from(head) {
        if cfg.node(node).kind != CfgKind::Instr
            || claimed.contains(&node)
            || predecessors.get(&node).copied().unwrap_or(0) > 1
            || cfg.node(node).ast.is_none()
        {
            continue;
        }
        for &next in &cfg.node(node).next {
            if cfg.node(next).kind != CfgKind::Instr
                || claimed.contains(&next)
                || predecessors.get(&next).copied().unwrap_or(0) > 1
                || cfg.node(next).ast.is_none()
            {
                continue;
            }
            pairs.push((node, next));
            claimed.push(node);
            claimed.push(next);
        }
    }
    pairs
}

/// `Block(a, b)`, dissolving operands that are already merge blocks.
fn merge_statements(ast: &mut Ast, first: NodeId, second: NodeId) -> NodeId {
    let mut children = Vec::new();
    for part in [first, second] {
        match &ast.node(part).kind {
            NodeKind::Block {
                children: inner, ..
            } => children.extend(inner.clone()),
            _ => children.push(part),
        }
    }
    ast.add(
        NodeKind::Block {
            scope: None,
            children,
        },
        None,
    )
}
