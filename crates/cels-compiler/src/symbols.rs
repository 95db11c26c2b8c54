//! Hierarchical scopes, symbols and the data type algebra.
//!
//! Scopes and symbols are arena-allocated and addressed by stable ids;
//! back-references (scope ↔ associated symbol, symbol → scope) are ids,
//! so the logically cyclic structure contains no reference cycles.
//!
//! Every symbol carries a monotonic `sid`. Emission orders the members
//! of a scope by `sid`, which reproduces declaration order.

use crate::{ScopeError, TypeError};
use crate::ast::NodeId;

/// Index of a scope in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(pub u32);

/// Index of a symbol in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(pub u32);

/// Index of a function overload in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OverloadId(pub u32);

/// A data type: a named type symbol or a derived pointer/array/task
/// type. Equality is structural, which coincides with full-name
/// equality because symbol names are unique per scope.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum DataType {
    Named(SymbolId),
    Pointer(Box<DataType>),
    Array(Box<DataType>, u64),
    Task(Box<DataType>),
}

impl DataType {
    pub fn pointer_to(&self) -> DataType {
        DataType::Pointer(Box::new(self.clone()))
    }

    pub fn array_of(&self, length: u64) -> DataType {
        DataType::Array(Box::new(self.clone()), length)
    }

    pub fn task_of(&self) -> DataType {
        DataType::Task(Box::new(self.clone()))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, DataType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(..))
    }

    pub fn is_task(&self) -> bool {
        matches!(self, DataType::Task(_))
    }

    /// Element type of a pointer, array or task type.
    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::Pointer(e) | DataType::Array(e, _) | DataType::Task(e) => Some(e),
            DataType::Named(_) => None,
        }
    }
}

/// What a symbol is.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    Primitive,
    Struct {
        inner_scope: Option<ScopeId>,
        members: Vec<SymbolId>,
    },
    Variable {
        ty: DataType,
    },
    Param {
        ty: DataType,
    },
    Field {
        ty: DataType,
        declaring: SymbolId,
    },
    Function {
        overloads: Vec<OverloadId>,
        declaring: Option<SymbolId>,
    },
}

/// A named, scoped symbol with its stable `sid`.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub scope: ScopeId,
    pub sid: u32,
    pub full_name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Declared type of a value symbol.
    pub fn data_type(&self) -> Option<&DataType> {
        match &self.kind {
            SymbolKind::Variable { ty } | SymbolKind::Param { ty } | SymbolKind::Field { ty, .. } => {
                Some(ty)
            }
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Primitive | SymbolKind::Struct { .. })
    }
}

/// One overload of a function symbol.
#[derive(Clone, Debug)]
pub struct FunctionOverload {
    pub function: SymbolId,
    pub params: Vec<SymbolId>,
    pub return_type: DataType,
    pub implementation: Option<NodeId>,
    pub is_multiframe: bool,
    pub is_extern: bool,
    pub cpp_include: Option<String>,
}

/// A scope tree node.
#[derive(Clone, Debug)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub symbols: Vec<SymbolId>,
    pub visible: Vec<ScopeId>,
    pub associated: Option<SymbolId>,
    pub is_package: bool,
    pub full_name: String,
}

/// How `get_subscope` treats missing or present components.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeStrategy {
    Get,
    Create,
    GetOrCreate,
}

impl ScopeStrategy {
    fn may_get(self) -> bool {
        matches!(self, ScopeStrategy::Get | ScopeStrategy::GetOrCreate)
    }

    fn may_create(self) -> bool {
        matches!(self, ScopeStrategy::Create | ScopeStrategy::GetOrCreate)
    }
}

pub const SEPARATOR: &str = "::";

/// The scope/symbol/overload arena.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    overloads: Vec<FunctionOverload>,
    next_sid: u32,
}

impl SymbolTable {
    /// A table holding only the root scope.
    pub fn new() -> Self {
        let mut table = Self::default();
        table.scopes.push(Scope {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            symbols: Vec::new(),
            visible: Vec::new(),
            associated: None,
            is_package: false,
            full_name: String::new(),
        });
        table
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    #[inline]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    #[inline]
    pub fn overload(&self, id: OverloadId) -> &FunctionOverload {
        &self.overloads[id.0 as usize]
    }

    pub fn overload_mut(&mut self, id: OverloadId) -> &mut FunctionOverload {
        &mut self.overloads[id.0 as usize]
    }

    pub fn mark_package(&mut self, id: ScopeId) {
        self.scope_mut(id).is_package = true;
    }

    pub fn set_associated(&mut self, scope: ScopeId, symbol: SymbolId) {
        self.scope_mut(scope).associated = Some(symbol);
    }

    pub fn add_visible_scope(&mut self, scope: ScopeId, visible: ScopeId) {
        let entry = self.scope_mut(scope);
        if !entry.visible.contains(&visible) {
            entry.visible.push(visible);
        }
    }

    /// Walk (or create) nested scopes along `path`.
    pub fn get_subscope(
        &mut self,
        from: ScopeId,
        path: &[&str],
        strategy: ScopeStrategy,
    ) -> Result<ScopeId, ScopeError> {
        let mut current = from;
        for component in path {
            let matches: Vec<ScopeId> = self
                .scope(current)
                .children
                .iter()
                .copied()
                .filter(|&c| self.scope(c).name == *component)
                .collect();
            current = match matches.as_slice() {
                [] if strategy.may_create() => self.create_scope(current, component),
                [] => {
                    return Err(ScopeError::MissingScope(format!(
                        "{}{}{}",
                        self.scope(current).full_name,
                        SEPARATOR,
                        component
                    )));
                }
                [found] if strategy.may_get() => *found,
                [found] => {
                    return Err(ScopeError::ScopeExists(
                        self.scope(*found).full_name.clone(),
                    ));
                }
                _ => {
                    return Err(ScopeError::DuplicateScope(format!(
                        "{}{}{}",
                        self.scope(current).full_name,
                        SEPARATOR,
                        component
                    )));
                }
            };
        }
        Ok(current)
    }

    fn create_scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let full_name = format!("{}{}{}", self.scope(parent).full_name, SEPARATOR, name);
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name: name.to_owned(),
            parent: Some(parent),
            children: Vec::new(),
            symbols: Vec::new(),
            visible: Vec::new(),
            associated: None,
            is_package: false,
            full_name,
        });
        self.scope_mut(parent).children.push(id);
        id
    }

    /// Add a symbol to a scope. Names are unique within a scope.
    pub fn add_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
    ) -> Result<SymbolId, ScopeError> {
        let duplicate = self
            .scope(scope)
            .symbols
            .iter()
            .any(|&s| self.symbol(s).name == name);
        if duplicate {
            return Err(ScopeError::DuplicateSymbol {
                name: name.to_owned(),
                scope: self.scope(scope).full_name.clone(),
            });
        }

        let full_name = format!("{}{}{}", self.scope(scope).full_name, SEPARATOR, name);
        self.next_sid += 1;
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_owned(),
            scope,
            sid: self.next_sid,
            full_name,
            kind,
        });
        self.scope_mut(scope).symbols.push(id);
        Ok(id)
    }

    /// Whether `symbol` is declared in `scope` or any of its descendants.
    pub fn is_in_scope(&self, symbol: SymbolId, scope: ScopeId) -> bool {
        let mut current = Some(self.symbol(symbol).scope);
        while let Some(s) = current {
            if s == scope {
                return true;
            }
            current = self.scope(s).parent;
        }
        false
    }

    /// Immediate lookup: a symbol named `name` directly in `scope`.
    pub fn try_resolve_immediate(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope)
            .symbols
            .iter()
            .copied()
            .find(|&s| self.symbol(s).name == name)
    }

    /// Match `path` against one scope: descend through child scopes for
    /// the leading components, then look for a symbol with the final
    /// name.
    fn resolve_in(&self, scope: ScopeId, path: &[&str]) -> Option<SymbolId> {
        let (last, prefix) = path.split_last()?;
        let mut current = scope;
        for component in prefix {
            current = self
                .scope(current)
                .children
                .iter()
                .copied()
                .find(|&c| self.scope(c).name == *component)?;
        }
        self.try_resolve_immediate(current, last)
    }

    /// Resolve a possibly qualified name: walk the parent chain looking
    /// for a match, then check the visible scopes of the starting scope.
    pub fn resolve(&self, from: ScopeId, path: &[&str]) -> Result<SymbolId, ScopeError> {
        let mut candidates: Vec<SymbolId> = Vec::new();

        let mut current = Some(from);
        while let Some(scope) = current {
            if let Some(found) = self.resolve_in(scope, path) {
                candidates.push(found);
                break;
            }
            current = self.scope(scope).parent;
        }

        for &visible in &self.scope(from).visible {
            if let Some(found) = self.resolve_in(visible, path) {
                candidates.push(found);
            }
        }

        candidates.dedup();
        match candidates.as_slice() {
            [] => Err(ScopeError::UnknownSymbol {
                name: path.join(SEPARATOR),
                scope: self.scope(from).full_name.clone(),
            }),
            [single] => Ok(*single),
            several => Err(ScopeError::AmbiguousSymbol {
                name: path.join(SEPARATOR),
                matches: several
                    .iter()
                    .map(|&s| self.symbol(s).full_name.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Register an overload; rejects a duplicate parameter type
    /// sequence on the same function.
    pub fn add_overload(
        &mut self,
        overload: FunctionOverload,
    ) -> Result<OverloadId, TypeError> {
        let function = overload.function;
        let new_types: Vec<&DataType> = overload
            .params
            .iter()
            .filter_map(|&p| self.symbol(p).data_type())
            .collect();

        let SymbolKind::Function { overloads, .. } = &self.symbol(function).kind else {
            return Err(TypeError::Other(format!(
                "{} is not a function",
                self.symbol(function).full_name
            )));
        };
        for &existing_id in overloads {
            let existing = self.overload(existing_id);
            let existing_types: Vec<&DataType> = existing
                .params
                .iter()
                .filter_map(|&p| self.symbol(p).data_type())
                .collect();
            if existing_types == new_types {
                return Err(TypeError::DuplicateOverload(
                    self.display_overload(existing_id),
                ));
            }
        }

        let id = OverloadId(self.overloads.len() as u32);
        self.overloads.push(overload);
        match &mut self.symbol_mut(function).kind {
            SymbolKind::Function { overloads, .. } => overloads.push(id),
            _ => unreachable!("checked above"),
        }
        Ok(id)
    }

    pub fn overload_count(&self, function: SymbolId) -> usize {
        match &self.symbol(function).kind {
            SymbolKind::Function { overloads, .. } => overloads.len(),
            _ => 0,
        }
    }

    pub fn add_struct_member(&mut self, struct_sym: SymbolId, member: SymbolId) {
        if let SymbolKind::Struct { members, .. } = &mut self.symbol_mut(struct_sym).kind {
            if !members.contains(&member) {
                members.push(member);
            }
        }
    }

    /// Human-readable type name: `::p::T`, `T*`, `T[4]`, `task<T>`.
    pub fn type_name(&self, ty: &DataType) -> String {
        match ty {
            DataType::Named(sym) => self.symbol(*sym).full_name.clone(),
            DataType::Pointer(e) => format!("{}*", self.type_name(e)),
            DataType::Array(e, n) => format!("{}[{}]", self.type_name(e), n),
            DataType::Task(e) => format!("task<{}>", self.type_name(e)),
        }
    }

    /// `::pkg::f(a:::int, b:::float):::void` style overload display.
    pub fn display_overload(&self, id: OverloadId) -> String {
        let overload = self.overload(id);
        let params: Vec<String> = overload
            .params
            .iter()
            .map(|&p| {
                let sym = self.symbol(p);
                let ty = sym
                    .data_type()
                    .map(|t| self.type_name(t))
                    .unwrap_or_default();
                format!("{}:{}", sym.name, ty)
            })
            .collect();
        format!(
            "{}({}):{}",
            self.symbol(overload.function).full_name,
            params.join(", "),
            self.type_name(&overload.return_type)
        )
    }

    /// All symbols, in creation (`sid`) order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len() as u32).map(SymbolId)
    }

    /// Child symbols of a scope sorted by `sid`.
    pub fn symbols_by_sid(&self, scope: ScopeId) -> Vec<SymbolId> {
        let mut symbols = self.scope(scope).symbols.clone();
        symbols.sort_by_key(|&s| self.symbol(s).sid);
        symbols
    }
}

/// The scope stack the builder parses under.
pub struct ScopeStack {
    stack: Vec<ScopeId>,
}

impl ScopeStack {
    pub fn new(global: ScopeId) -> Self {
        Self {
            stack: vec![global],
        }
    }

    pub fn push(
        &mut self,
        table: &mut SymbolTable,
        name: &str,
        strategy: ScopeStrategy,
    ) -> Result<ScopeId, ScopeError> {
        let top = self.peek();
        let scope = table.get_subscope(top, &[name], strategy)?;
        self.stack.push(scope);
        Ok(scope)
    }

    pub fn peek(&self) -> ScopeId {
        *self.stack.last().expect("global scope never popped")
    }

    pub fn pop(&mut self) -> Result<ScopeId, ScopeError> {
        if self.stack.len() == 1 {
            return Err(ScopeError::MissingScope(
                "pop called with only the global scope on the stack".to_owned(),
            ));
        }
        Ok(self.stack.pop().expect("checked non-empty"))
    }
}
