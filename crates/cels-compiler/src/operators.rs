//! Registration and lookup of operators, type converters and indexers.

use indexmap::IndexMap;

use crate::TypeError;
use crate::symbols::{DataType, SymbolTable};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Fixity {
    Prefix,
    Postfix,
}

impl std::fmt::Display for Fixity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fixity::Prefix => write!(f, "prefix"),
            Fixity::Postfix => write!(f, "postfix"),
        }
    }
}

/// A resolved binary operator.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BinaryOp {
    pub symbol: String,
    pub left: DataType,
    pub right: DataType,
    pub result: DataType,
}

/// A resolved unary operator.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UnaryOp {
    pub symbol: String,
    pub operand: DataType,
    pub fixity: Fixity,
    pub result: DataType,
}

/// A registered implicit conversion.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Converter {
    pub from: DataType,
    pub to: DataType,
}

/// A resolved indexer `element[key] -> output`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Indexer {
    pub archetype: String,
    pub element: DataType,
    pub key: DataType,
    pub output: DataType,
}

/// A family of indexers: the first archetype whose predicate accepts
/// `(element, key)` manufactures the indexer.
pub struct IndexerArchetype {
    pub name: String,
    pub predicate: Box<dyn Fn(&DataType, &DataType) -> bool>,
    pub factory: Box<dyn Fn(&DataType, &DataType) -> Indexer>,
}

/// Operator, converter and indexer tables.
#[derive(Default)]
pub struct OperatorSolver {
    binary: IndexMap<(String, DataType, DataType), BinaryOp>,
    unary: IndexMap<(String, DataType, Fixity), UnaryOp>,
    converters: IndexMap<(DataType, DataType), Converter>,
    archetypes: Vec<IndexerArchetype>,
    /// key type handed to the built-in pointer indexer fallback
    pointer_key: Option<DataType>,
}

impl OperatorSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_binary_operator(
        &mut self,
        table: &SymbolTable,
        symbol: &str,
        left: DataType,
        right: DataType,
        result: DataType,
    ) -> Result<(), TypeError> {
        let key = (symbol.to_owned(), left.clone(), right.clone());
        if self.binary.contains_key(&key) {
            return Err(TypeError::DuplicateBinaryOperator {
                symbol: symbol.to_owned(),
                left: table.type_name(&left),
                right: table.type_name(&right),
            });
        }
        self.binary.insert(
            key,
            BinaryOp {
                symbol: symbol.to_owned(),
                left,
                right,
                result,
            },
        );
        Ok(())
    }

    pub fn resolve_binary_operator(
        &self,
        table: &SymbolTable,
        symbol: &str,
        left: &DataType,
        right: &DataType,
    ) -> Result<&BinaryOp, TypeError> {
        self.binary
            .get(&(symbol.to_owned(), left.clone(), right.clone()))
            .ok_or_else(|| TypeError::NoBinaryOperator {
                symbol: symbol.to_owned(),
                left: table.type_name(left),
                right: table.type_name(right),
            })
    }

    pub fn register_unary_operator(
        &mut self,
        table: &SymbolTable,
        symbol: &str,
        operand: DataType,
        fixity: Fixity,
        result: DataType,
    ) -> Result<(), TypeError> {
        let key = (symbol.to_owned(), operand.clone(), fixity);
        if self.unary.contains_key(&key) {
            return Err(TypeError::DuplicateUnaryOperator {
                symbol: symbol.to_owned(),
                fixity: fixity.to_string(),
                operand: table.type_name(&operand),
            });
        }
        self.unary.insert(
            key,
            UnaryOp {
                symbol: symbol.to_owned(),
                operand,
                fixity,
                result,
            },
        );
        Ok(())
    }

    pub fn resolve_unary_operator(
        &self,
        table: &SymbolTable,
        symbol: &str,
        operand: &DataType,
        fixity: Fixity,
    ) -> Result<&UnaryOp, TypeError> {
        self.unary
            .get(&(symbol.to_owned(), operand.clone(), fixity))
            .ok_or_else(|| TypeError::NoUnaryOperator {
                symbol: symbol.to_owned(),
                fixity: fixity.to_string(),
                operand: table.type_name(operand),
            })
    }

    pub fn register_converter(
        &mut self,
        table: &SymbolTable,
        from: DataType,
        to: DataType,
    ) -> Result<(), TypeError> {
        let key = (from.clone(), to.clone());
        if self.converters.contains_key(&key) {
            return Err(TypeError::DuplicateConverter {
                from: table.type_name(&from),
                to: table.type_name(&to),
            });
        }
        self.converters.insert(key, Converter { from, to });
        Ok(())
    }

    pub fn can_convert(&self, from: &DataType, to: &DataType) -> bool {
        self.converters
            .contains_key(&(from.clone(), to.clone()))
    }

    pub fn resolve_converter(
        &self,
        table: &SymbolTable,
        from: &DataType,
        to: &DataType,
    ) -> Result<&Converter, TypeError> {
        self.converters
            .get(&(from.clone(), to.clone()))
            .ok_or_else(|| TypeError::NoConverter {
                from: table.type_name(from),
                to: table.type_name(to),
            })
    }

    pub fn register_indexer_archetype(&mut self, archetype: IndexerArchetype) {
        self.archetypes.push(archetype);
    }

    /// Key type used by the built-in pointer indexer fallback.
    pub fn set_pointer_key(&mut self, key: DataType) {
        self.pointer_key = Some(key);
    }

    /// Archetypes are consulted in registration order; pointers fall
    /// through to the built-in pointer indexer.
    pub fn resolve_indexer(
        &self,
        table: &SymbolTable,
        element: &DataType,
        key: &DataType,
    ) -> Result<Indexer, TypeError> {
        for archetype in &self.archetypes {
            if (archetype.predicate)(element, key) {
                return Ok((archetype.factory)(element, key));
            }
        }

        if let DataType::Pointer(inner) = element {
            if let Some(pointer_key) = &self.pointer_key {
                return Ok(Indexer {
                    archetype: "pointer".to_owned(),
                    element: element.clone(),
                    key: pointer_key.clone(),
                    output: (**inner).clone(),
                });
            }
        }

        Err(TypeError::NoIndexer {
            element: table.type_name(element),
            key: table.type_name(key),
        })
    }
}
