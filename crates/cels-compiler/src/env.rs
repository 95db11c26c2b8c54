//! The compilation environment: symbol table, operator solver and the
//! built-in registrations.
//!
//! Built once per compilation and passed explicitly; there are no
//! process-wide singletons, so test suites can create as many
//! environments as they like.

use crate::ScopeError;
use crate::operators::{Fixity, Indexer, IndexerArchetype, OperatorSolver};
use crate::symbols::{
    DataType, ScopeId, ScopeStrategy, SymbolId, SymbolKind, SymbolTable,
};

/// Symbol table plus operator tables plus the primitive type handles.
pub struct Env {
    pub table: SymbolTable,
    pub ops: OperatorSolver,

    pub ty_int: SymbolId,
    pub ty_uint: SymbolId,
    pub ty_short: SymbolId,
    pub ty_ushort: SymbolId,
    pub ty_float: SymbolId,
    pub ty_bool: SymbolId,
    pub ty_string: SymbolId,
    pub ty_void: SymbolId,
    /// marker type of function symbols in expressions
    pub ty_function: SymbolId,
    /// marker type of method accessors
    pub ty_instance_method: SymbolId,
    /// marker type of closure literals
    pub ty_closure_function: SymbolId,

    internal_ids: u32,
    anon_scope_ids: u32,
}

impl Env {
    /// An environment with the primitive types and no operators.
    pub fn new() -> Self {
        let mut table = SymbolTable::new();
        let root = table.root();
        let mut primitive = |name: &str| {
            table
                .add_symbol(root, name, SymbolKind::Primitive)
                .expect("fresh root scope has no duplicates")
        };

        let ty_int = primitive("int");
        let ty_uint = primitive("uint");
        let ty_short = primitive("short");
        let ty_ushort = primitive("ushort");
        let ty_float = primitive("float");
        let ty_bool = primitive("bool");
        let ty_string = primitive("string");
        let ty_void = primitive("void");
        let ty_function = primitive("@function");
        let ty_instance_method = primitive("@instance_method");
        let ty_closure_function = primitive("@closure_function");

        Self {
            table,
            ops: OperatorSolver::new(),
            ty_int,
            ty_uint,
            ty_short,
            ty_ushort,
            ty_float,
            ty_bool,
            ty_string,
            ty_void,
            ty_function,
            ty_instance_method,
            ty_closure_function,
            internal_ids: 0,
            anon_scope_ids: 0,
        }
    }

    /// The default environment: integer and float arithmetic and
    /// comparisons, boolean equality, prefix `-` and `not`, the widening
    /// converters, and the static-array indexer.
    pub fn default_env() -> Self {
        let mut env = Self::new();
        let int = env.dtype_int();
        let uint = env.dtype(env.ty_uint);
        let short = env.dtype(env.ty_short);
        let ushort = env.dtype(env.ty_ushort);
        let float = env.dtype_float();
        let bool_ = env.dtype_bool();

        let arith = ["+", "-", "*", "/", "%"];
        let compare = ["<", "<=", ">", ">=", "==", "!="];

        for op in arith {
            env.register_binary(op, &int, &int, &int);
        }
        for op in compare {
            env.register_binary(op, &int, &int, &bool_);
        }
        for op in ["+", "-", "*", "/"] {
            env.register_binary(op, &float, &float, &float);
        }
        for op in compare {
            env.register_binary(op, &float, &float, &bool_);
        }
        for op in ["==", "!="] {
            env.register_binary(op, &bool_, &bool_, &bool_);
        }

        env.ops
            .register_unary_operator(&env.table, "-", int.clone(), Fixity::Prefix, int.clone())
            .expect("fresh solver");
        env.ops
            .register_unary_operator(
                &env.table,
                "-",
                float.clone(),
                Fixity::Prefix,
                float.clone(),
            )
            .expect("fresh solver");
        env.ops
            .register_unary_operator(
                &env.table,
                "not",
                bool_.clone(),
                Fixity::Prefix,
                bool_.clone(),
            )
            .expect("fresh solver");

        for (from, to) in [
            (&int, &float),
            (&short, &int),
            (&short, &float),
            (&ushort, &int),
            (&ushort, &uint),
            (&ushort, &float),
            (&uint, &float),
        ] {
            env.ops
                .register_converter(&env.table, (*from).clone(), (*to).clone())
                .expect("fresh solver");
        }

        env.ops.set_pointer_key(int.clone());
        env.ops.register_indexer_archetype(IndexerArchetype {
            name: "static_array".to_owned(),
            predicate: Box::new(|element, _key| element.is_array()),
            factory: {
                let int = int.clone();
                Box::new(move |element, _key| Indexer {
                    archetype: "static_array".to_owned(),
                    element: element.clone(),
                    key: int.clone(),
                    output: element
                        .element()
                        .cloned()
                        .expect("array types have an element"),
                })
            },
        });

        env
    }

    fn register_binary(&mut self, op: &str, left: &DataType, right: &DataType, result: &DataType) {
        self.ops
            .register_binary_operator(
                &self.table,
                op,
                left.clone(),
                right.clone(),
                result.clone(),
            )
            .expect("default environment registers each operator once");
    }

    pub fn dtype(&self, sym: SymbolId) -> DataType {
        DataType::Named(sym)
    }

    pub fn dtype_int(&self) -> DataType {
        DataType::Named(self.ty_int)
    }

    pub fn dtype_float(&self) -> DataType {
        DataType::Named(self.ty_float)
    }

    pub fn dtype_bool(&self) -> DataType {
        DataType::Named(self.ty_bool)
    }

    pub fn dtype_string(&self) -> DataType {
        DataType::Named(self.ty_string)
    }

    pub fn dtype_void(&self) -> DataType {
        DataType::Named(self.ty_void)
    }

    pub fn dtype_function(&self) -> DataType {
        DataType::Named(self.ty_function)
    }

    pub fn dtype_instance_method(&self) -> DataType {
        DataType::Named(self.ty_instance_method)
    }

    pub fn dtype_closure_function(&self) -> DataType {
        DataType::Named(self.ty_closure_function)
    }

    /// Fresh id for compiler-generated symbols (`cels_s<n>`,
    /// `icels_lambda_<n>`).
    pub fn next_internal_id(&mut self) -> u32 {
        self.internal_ids += 1;
        self.internal_ids
    }

    /// Fresh name for an anonymous scope.
    pub fn next_anon_scope_name(&mut self) -> String {
        self.anon_scope_ids += 1;
        format!("@{}", self.anon_scope_ids)
    }

    /// Create the synthetic global function a lambda lowers into, with
    /// its overload scope.
    pub fn generate_lambda_function(&mut self) -> Result<(SymbolId, ScopeId), ScopeError> {
        let name = format!("icels_lambda_{}", self.next_internal_id());
        let root = self.table.root();
        let func = self.table.add_symbol(
            root,
            &name,
            SymbolKind::Function {
                overloads: Vec::new(),
                declaring: None,
            },
        )?;
        let scope_name = format!("@{}_ov{}", name, self.table.overload_count(func) + 1);
        let scope = self
            .table
            .get_subscope(root, &[&scope_name], ScopeStrategy::Create)?;
        self.table.set_associated(scope, func);
        Ok((func, scope))
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_env_registers_primitives() {
        let env = Env::default_env();
        let int = env.table.resolve(env.table.root(), &["int"]).unwrap();
        assert_eq!(int, env.ty_int);
        let float = env.table.resolve(env.table.root(), &["float"]).unwrap();
        assert_eq!(float, env.ty_float);
    }

    #[test]
    fn default_env_operators() {
        let env = Env::default_env();
        let int = env.dtype_int();
        let bool_ = env.dtype_bool();

        let op = env
            .ops
            .resolve_binary_operator(&env.table, "<", &int, &int)
            .unwrap();
        assert_eq!(op.result, bool_);

        assert!(env.ops.can_convert(&int, &env.dtype_float()));
        assert!(!env.ops.can_convert(&env.dtype_float(), &int));
        assert!(
            env.ops
                .resolve_unary_operator(&env.table, "not", &bool_, Fixity::Prefix)
                .is_ok()
        );
    }

    #[test]
    fn lambda_functions_get_unique_names() {
        let mut env = Env::default_env();
        let (f1, s1) = env.generate_lambda_function().unwrap();
        let (f2, s2) = env.generate_lambda_function().unwrap();
        assert_ne!(f1, f2);
        assert_ne!(s1, s2);
        assert_eq!(env.table.symbol(f1).name, "icels_lambda_1");
        assert_eq!(env.table.symbol(f2).name, "icels_lambda_2");
        assert_eq!(env.table.scope(s1).associated, Some(f1));
    }
}
