//! Ungrouping the AST of a multiframe body into single-instruction CFG
//! nodes.
//!
//! Node types mirror what the emitter needs: `Instr` (straight-line
//! code), `Cond` (two successors: false then true), `Jump` (transfer to
//! another functional component) and `End` (frame return).

use std::collections::HashMap;

use crate::ast::{Ast, NodeId, NodeKind};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CfgNodeId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CfgKind {
    Instr,
    Cond,
    Jump,
    End,
}

#[derive(Clone, Debug)]
pub struct CfgNode {
    pub kind: CfgKind,
    pub ast: Option<NodeId>,
    pub next: Vec<CfgNodeId>,
    /// target functional component of a `Jump` node
    pub component: Option<u32>,
}

/// The control-flow graph of one multiframe body.
#[derive(Debug)]
pub struct Cfg {
    nodes: Vec<CfgNode>,
    pub start: CfgNodeId,
    pub body: CfgNodeId,
    pub end: CfgNodeId,
}

struct JumpTargets {
    breaks: HashMap<NodeId, CfgNodeId>,
    continues: HashMap<NodeId, CfgNodeId>,
}

impl Cfg {
    /// `start -> body -> end`, then the body node is recursively
    /// ungrouped into single instructions.
    pub fn build(ast: &Ast, implementation: NodeId) -> Result<Cfg, String> {
        let mut cfg = Cfg {
            nodes: Vec::new(),
            start: CfgNodeId(0),
            body: CfgNodeId(0),
            end: CfgNodeId(0),
        };
        let start = cfg.push(CfgKind::Instr, None);
        let body = cfg.push(CfgKind::Instr, Some(implementation));
        let end = cfg.push(CfgKind::End, None);
        cfg.link(start, body);
        cfg.link(body, end);
        cfg.start = start;
        cfg.body = body;
        cfg.end = end;

        let mut targets = JumpTargets {
            breaks: HashMap::new(),
            continues: HashMap::new(),
        };
        cfg.ungroup(body, ast, &mut targets)?;
        Ok(cfg)
    }

    pub fn push(&mut self, kind: CfgKind, ast: Option<NodeId>) -> CfgNodeId {
        let id = CfgNodeId(self.nodes.len() as u32);
        self.nodes.push(CfgNode {
            kind,
            ast,
            next: Vec::new(),
            component: None,
        });
        id
    }

    pub fn link(&mut self, from: CfgNodeId, to: CfgNodeId) {
        self.nodes[from.0 as usize].next.push(to);
    }

    #[inline]
    pub fn node(&self, id: CfgNodeId) -> &CfgNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: CfgNodeId) -> &mut CfgNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Nodes reachable from `from`, depth-first.
    pub fn reachable_from(&self, from: CfgNodeId) -> Vec<CfgNodeId> {
        let mut visited = Vec::new();
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0 as usize], true) {
                continue;
            }
            visited.push(id);
            for &next in &self.node(id).next {
                stack.push(next);
            }
        }
        visited
    }

    fn ungroup(
        &mut self,
        node: CfgNodeId,
        ast: &Ast,
        targets: &mut JumpTargets,
    ) -> Result<(), String> {
        let Some(ast_id) = self.node(node).ast else {
            return Ok(());
        };

        match &ast.node(ast_id).kind {
            NodeKind::Block { children, .. } => {
                let children = children.clone();
                if children.is_empty() {
                    return Ok(());
                }
                // this node becomes the first statement; the rest chain
                // behind it, the last one inheriting the old successors
                let old_next = std::mem::take(&mut self.node_mut(node).next);
                self.node_mut(node).ast = Some(children[0]);

                let mut chain = vec![node];
                for &child in &children[1..] {
                    chain.push(self.push(CfgKind::Instr, Some(child)));
                }
                for pair in chain.windows(2) {
                    self.link(pair[0], pair[1]);
                }
                self.node_mut(*chain.last().expect("chain is non-empty")).next = old_next;

                for &link in &chain {
                    self.ungroup(link, ast, targets)?;
                }
                Ok(())
            }
            NodeKind::While { condition, body } => {
                let (condition, body) = (*condition, *body);
                if self.node(node).next.len() != 1 {
                    return Err(format!(
                        "while node expected one successor, got {}",
                        self.node(node).next.len()
                    ));
                }
                let exit = self.node(node).next[0];

                // record break/continue targets before descending; the
                // scan must not look into nested loops
                let mut breaks = Vec::new();
                let mut continues = Vec::new();
                ast.visit(body, &mut |ast, id| match &ast.node(id).kind {
                    NodeKind::While { .. } => true,
                    NodeKind::Break => {
                        breaks.push(id);
                        false
                    }
                    NodeKind::Continue => {
                        continues.push(id);
                        false
                    }
                    _ => false,
                });

                let body_node = self.push(CfgKind::Instr, Some(body));
                self.link(body_node, node);
                self.link(node, body_node); // next = [exit, body]

                self.node_mut(node).ast = Some(condition);
                self.node_mut(node).kind = CfgKind::Cond;

                for b in breaks {
                    targets.breaks.insert(b, exit);
                }
                for c in continues {
                    targets.continues.insert(c, node);
                }

                self.ungroup(body_node, ast, targets)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let (condition, then_branch, else_branch) =
                    (*condition, *then_branch, *else_branch);

                let join = self.push(CfgKind::Instr, None);
                let old_next = std::mem::take(&mut self.node_mut(node).next);
                self.node_mut(join).next = old_next;

                let then_node = self.push(CfgKind::Instr, Some(then_branch));
                self.link(then_node, join);

                // next = [false-branch, true-branch]
                self.node_mut(node).next = vec![join, then_node];
                let else_node = match else_branch {
                    Some(else_ast) => {
                        let else_node = self.push(CfgKind::Instr, Some(else_ast));
                        self.link(else_node, join);
                        self.node_mut(node).next[0] = else_node;
                        Some(else_node)
                    }
                    None => None,
                };

                self.node_mut(node).ast = Some(condition);
                self.node_mut(node).kind = CfgKind::Cond;

                self.ungroup(then_node, ast, targets)?;
                if let Some(else_node) = else_node {
                    self.ungroup(else_node, ast, targets)?;
                }
                Ok(())
            }
            NodeKind::Break => {
                let target = targets
                    .breaks
                    .get(&ast_id)
                    .copied()
                    .ok_or_else(|| "break outside of a loop".to_owned())?;
                self.node_mut(node).next = vec![target];
                Ok(())
            }
            NodeKind::Continue => {
                let target = targets
                    .continues
                    .get(&ast_id)
                    .copied()
                    .ok_or_else(|| "continue outside of a loop".to_owned())?;
                self.node_mut(node).next = vec![target];
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
