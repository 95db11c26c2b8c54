//! Partitioning the CFG into functional components.
//!
//! Every node is labelled with the set of BFS waves that reach it
//! without crossing a suspension point. Distinct label sets are
//! distinct components; edges between components are routed through
//! `Jump` nodes, and every `PreCall` records the component the
//! controller resumes at.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::symbols::SymbolTable;

use super::cfg::{Cfg, CfgKind, CfgNodeId};
use super::collapse;

/// One functional component: its id and entry node. The entry
/// component has id 1.
#[derive(Clone, Copy, Debug)]
pub struct Component {
    pub id: u32,
    pub head: CfgNodeId,
}

/// Steps 3-5 of the lowering: suspension marking, partitioning, linear
/// collapse. Returns components sorted by id.
pub fn find_functional_components(
    cfg: &mut Cfg,
    ast: &mut Ast,
    table: &SymbolTable,
) -> Result<Vec<Component>, String> {
    split_multiframe_calls(cfg, ast, table);

    let mut labels: HashMap<CfgNodeId, Vec<u32>> = HashMap::new();
    for node in cfg.reachable_from(cfg.start) {
        labels.insert(node, Vec::new());
    }

    let mut heads: IndexSet<CfgNodeId> = IndexSet::new();
    heads.insert(cfg.body);
    heads.insert(cfg.start);

    // wave labelling: start a wave at the entry and after every
    // suspension; a wave stops at suspension points and at other heads
    let mut wave = 1u32;
    let mut frontier = vec![cfg.body];
    while !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for head in frontier {
            let suspensions = flood(cfg, ast, head, wave, &mut labels, &heads);
            wave += 1;
            for suspension in suspensions {
                let resume = cfg.node(suspension).next.first().copied();
                if let Some(resume) = resume {
                    if heads.insert(resume) {
                        next_frontier.push(resume);
                    }
                }
            }
            // a label mismatch across an edge starts a new head as well
            for node in cfg.reachable_from(cfg.start) {
                for &next in &cfg.node(node).next {
                    let differ = labels.get(&node) != labels.get(&next);
                    let both_labelled = labels.get(&node).is_some_and(|l| !l.is_empty())
                        && labels.get(&next).is_some_and(|l| !l.is_empty());
                    if differ && both_labelled && heads.insert(next) {
                        next_frontier.push(next);
                    }
                }
            }
        }
        frontier = next_frontier;
    }

    // canonical component numbers, in discovery order from the start
    // node; the start node's empty label takes 0, the entry takes 1
    let mut numbering: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut component_of: HashMap<CfgNodeId, u32> = HashMap::new();
    for node in cfg.reachable_from(cfg.start) {
        let label = labels.get(&node).cloned().unwrap_or_default();
        let next_number = numbering.len() as u32;
        let number = *numbering.entry(label).or_insert(next_number);
        component_of.insert(node, number);
    }

    // route cross-component edges (and edges onto heads) through Jump
    // nodes
    let mut rewires: Vec<(CfgNodeId, usize, u32)> = Vec::new();
    for &head in &heads {
        let comp = component_of[&head];
        for node in cfg.reachable_from(head) {
            if component_of[&node] != comp {
                continue;
            }
            for (slot, &next) in cfg.node(node).next.iter().enumerate() {
                if component_of[&next] != comp || heads.contains(&next) {
                    rewires.push((node, slot, component_of[&next]));
                }
            }
        }
    }
    for (node, slot, target_component) in rewires {
        if cfg.node(cfg.node(node).next[slot]).kind == CfgKind::Jump {
            continue; // already rewired from another head's sweep
        }
        let jump = cfg.push(CfgKind::Jump, None);
        cfg.node_mut(jump).component = Some(target_component);
        cfg.node_mut(node).next[slot] = jump;
    }

    // every PreCall resumes at the component its trailing jump targets
    let mut pre_jumps: Vec<(NodeId, u32)> = Vec::new();
    for node in cfg.reachable_from(cfg.start) {
        let Some(ast_id) = cfg.node(node).ast else {
            continue;
        };
        if !matches!(ast.node(ast_id).kind, NodeKind::PreCall { .. }) {
            continue;
        }
        let next = &cfg.node(node).next;
        let jump_target = match next.as_slice() {
            [single] if cfg.node(*single).kind == CfgKind::Jump => {
                cfg.node(*single).component.expect("jump nodes carry a target")
            }
            other => {
                return Err(format!(
                    "a multiframe call must be followed by a component jump, got {} successors",
                    other.len()
                ));
            }
        };
        pre_jumps.push((ast_id, jump_target));
    }
    for (ast_id, target) in pre_jumps {
        if let NodeKind::PreCall { jump, .. } = &mut ast.node_mut(ast_id).kind {
            *jump = Some(target);
        }
    }

    // collapse linear paths inside every component; component 0 is the
    // bootstrap around the start node, component 1 the entry
    let mut components: Vec<Component> = heads
        .iter()
        .map(|&head| Component {
            id: component_of[&head],
            head,
        })
        .collect();
    components.sort_by_key(|c| c.id);

    for component in &components {
        collapse::collapse_linear_paths(cfg, ast, component.head)?;
    }

    Ok(components)
}

/// Replace every multiframe call instruction with its `[PreCall,
/// PostCall]` pair.
fn split_multiframe_calls(cfg: &mut Cfg, ast: &mut Ast, table: &SymbolTable) {
    for node in cfg.reachable_from(cfg.start) {
        let Some(ast_id) = cfg.node(node).ast else {
            continue;
        };

        let (call, lhs) = match &ast.node(ast_id).kind {
            NodeKind::Assign { left, right } => match &ast.node(*right).kind {
                NodeKind::Call { overload, .. } if table.overload(*overload).is_multiframe => {
                    (*right, Some(*left))
                }
                _ => continue,
            },
            NodeKind::Call { overload, .. } if table.overload(*overload).is_multiframe => {
                (ast_id, None)
            }
            _ => continue,
        };

        let pre = ast.add(
            NodeKind::PreCall {
                call,
                lhs,
                jump: None,
            },
            None,
        );
        let post = ast.add(NodeKind::PostCall { call, lhs }, None);

        let post_node = cfg.push(CfgKind::Instr, Some(post));
        let old_next = std::mem::take(&mut cfg.node_mut(node).next);
        cfg.node_mut(post_node).next = old_next;
        cfg.node_mut(node).ast = Some(pre);
        cfg.node_mut(node).next = vec![post_node];
    }
}

/// Label every node reachable from `from` without crossing a
/// suspension point or entering another head; returns the suspension
/// nodes encountered.
fn flood(
    cfg: &Cfg,
    ast: &Ast,
    from: CfgNodeId,
    wave: u32,
    labels: &mut HashMap<CfgNodeId, Vec<u32>>,
    heads: &IndexSet<CfgNodeId>,
) -> Vec<CfgNodeId> {
    let mut suspensions = Vec::new();
    let mut visited: IndexSet<CfgNodeId> = IndexSet::new();
    let mut queue = VecDeque::from([from]);

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        labels.entry(node).or_default().push(wave);

        let is_suspension = cfg.node(node).ast.is_some_and(|ast_id| {
            matches!(
                ast.node(ast_id).kind,
                NodeKind::Suspend | NodeKind::PreCall { .. }
            )
        });
        if is_suspension {
            suspensions.push(node);
            continue;
        }
        for &next in &cfg.node(node).next {
            if !visited.contains(&next) && !heads.contains(&next) {
                queue.push_back(next);
            }
        }
    }
    suspensions
}
