//! Multiframe lowering: explicit activation records and a labelled
//! state machine instead of a runtime stack.
//!
//! The pass runs in two stages. `extract` rewrites the whole program so
//! that every multiframe call sits alone on the right-hand side of an
//! assignment (or is a bare call statement). `lower_overload` then turns
//! one multiframe body into a control-flow graph, splits calls into
//! pre/post halves, partitions the graph into functional components
//! around suspension points and collapses linear instruction runs.

mod cfg;
mod collapse;
mod components;
mod extract;

#[cfg(test)]
mod extract_tests;

pub use cfg::{Cfg, CfgKind, CfgNode, CfgNodeId};
pub use components::Component;
pub use extract::extract_multiframe_calls;

use crate::EmitError;
use crate::ast::Ast;
use crate::symbols::{OverloadId, SymbolTable};

/// A lowered multiframe body: the mutated CFG plus its functional
/// components sorted by id.
#[derive(Debug)]
pub struct LoweredMultiframe {
    pub cfg: Cfg,
    pub components: Vec<Component>,
}

/// Lower one multiframe overload. The overload must have an
/// implementation.
pub fn lower_overload(
    table: &SymbolTable,
    ast: &mut Ast,
    overload: OverloadId,
) -> Result<LoweredMultiframe, EmitError> {
    let data = table.overload(overload);
    let implementation = data.implementation.ok_or_else(|| EmitError::Multiframe {
        overload: table.display_overload(overload),
        message: "multiframe function without a body".to_owned(),
    })?;

    let mut cfg = Cfg::build(ast, implementation).map_err(|message| EmitError::Multiframe {
        overload: table.display_overload(overload),
        message,
    })?;

    let components = components::find_functional_components(&mut cfg, ast, table).map_err(
        |message| EmitError::Multiframe {
            overload: table.display_overload(overload),
            message,
        },
    )?;

    tracing::debug!(
        overload = %table.display_overload(overload),
        components = components.len(),
        "multiframe overload lowered"
    );
    Ok(LoweredMultiframe { cfg, components })
}
