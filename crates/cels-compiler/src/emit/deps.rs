//! Topological ordering of emitted fragments.
//!
//! A fragment for entity `X` depends on the fragment for `Y` when `Y`
//! appears in `X`'s signature: field types for a struct, parameter and
//! return types for a function overload, looking through pointer, array
//! and task wrappers. Cycles are reported, not broken.

use indexmap::IndexSet;

use crate::EmitError;
use crate::symbols::{DataType, SymbolId, SymbolTable};

use super::snippet::CppSnippet;

/// One dependency-sortable unit of output.
#[derive(Debug)]
pub struct Fragment {
    /// the entity the fragment declares, when it declares one
    pub provides: Option<SymbolId>,
    /// enclosing package path
    pub namespace: Vec<String>,
    pub code: CppSnippet,
    pub deps: IndexSet<SymbolId>,
}

/// Collect the named type symbols a type mentions.
pub fn named_deps(ty: &DataType, out: &mut IndexSet<SymbolId>) {
    match ty {
        DataType::Named(sym) => {
            out.insert(*sym);
        }
        DataType::Pointer(e) | DataType::Array(e, _) | DataType::Task(e) => named_deps(e, out),
    }
}

/// Order fragments so that every fragment follows the fragments it
/// depends on. Dependencies nothing provides are ignored; among ready
/// fragments the original order is kept.
pub fn sort_fragments(
    table: &SymbolTable,
    fragments: Vec<Fragment>,
) -> Result<Vec<Fragment>, EmitError> {
    let provided: IndexSet<SymbolId> = fragments.iter().filter_map(|f| f.provides).collect();

    let mut remaining: Vec<Option<Fragment>> = fragments.into_iter().map(Some).collect();
    let mut emitted: IndexSet<SymbolId> = IndexSet::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    loop {
        let mut progressed = false;
        for slot in remaining.iter_mut() {
            let ready = slot.as_ref().is_some_and(|fragment| {
                fragment.deps.iter().all(|dep| {
                    Some(*dep) == fragment.provides
                        || !provided.contains(dep)
                        || emitted.contains(dep)
                })
            });
            if ready {
                let fragment = slot.take().expect("checked by is_some_and");
                if let Some(provides) = fragment.provides {
                    emitted.insert(provides);
                }
                ordered.push(fragment);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let stuck: Vec<String> = remaining
        .iter()
        .flatten()
        .filter_map(|f| f.provides)
        .map(|sym| table.symbol(sym).full_name.clone())
        .collect();
    if !stuck.is_empty() {
        return Err(EmitError::DependencyCycle(stuck.join(", ")));
    }
    Ok(ordered)
}
