//! The surface grammar and its semantic actions.
//!
//! Each grammar rule carries an action over `SemValue`, the union of
//! everything a reduction can produce: tokens, AST nodes, types,
//! symbols, parameter lists. Actions run during parsing, so scope
//! push/pop ε-rules mutate the environment exactly when the matching
//! source position is reached.

mod actions;
mod grammar_def;

#[cfg(test)]
mod build_tests;

use std::path::Path;

use cels_core::{Grammar, Lr1Parser, Lr1Token, Token};

use crate::ast::{Ast, NodeId};
use crate::env::Env;
use crate::symbols::{DataType, OverloadId, ScopeId, SymbolId};
use crate::tokens::CelsLexer;
use crate::{BuildError, Error};

pub use grammar_def::build_grammar;

/// A function specifier collected from a `FUNC_SPECS` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FuncSpec {
    Multiframe,
    Extern,
    CppInclude(String),
}

/// The value a reduction produces.
#[derive(Clone, Debug)]
pub enum SemValue {
    Token(Token),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Type(DataType),
    Symbol(SymbolId),
    Path(Vec<String>),
    Scope(ScopeId),
    Param(String, DataType),
    Params(Vec<(String, DataType)>),
    Spec(FuncSpec),
    Specs(Vec<FuncSpec>),
    Overload(OverloadId),
    LambdaHeader(ScopeId, Vec<SymbolId>),
    Unit,
}

/// A semantic action: consumes the popped rhs values, produces the lhs
/// value. Non-capturing closures in the rule table coerce to this.
pub type Action = fn(&mut Build<'_>, Vec<Option<SemValue>>) -> Result<SemValue, BuildError>;

/// Mutable state the actions operate on during one parse.
pub struct Build<'a> {
    pub env: &'a mut Env,
    pub ast: &'a mut Ast,
    pub scopes: crate::symbols::ScopeStack,
    pub named_scopes: Vec<String>,
    /// paths of `import` statements, for the driver to orchestrate
    pub imports: Vec<String>,
}

impl<'a> Build<'a> {
    pub fn new(env: &'a mut Env, ast: &'a mut Ast) -> Self {
        let root = env.table.root();
        Self {
            env,
            ast,
            scopes: crate::symbols::ScopeStack::new(root),
            named_scopes: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.scopes.peek()
    }
}

// --- argument accessors -------------------------------------------------

pub(crate) fn take(args: &mut [Option<SemValue>], i: usize) -> SemValue {
    args[i].take().expect("driver fills every rhs slot")
}

pub(crate) fn expect_token(v: SemValue) -> Result<Token, BuildError> {
    match v {
        SemValue::Token(t) => Ok(t),
        other => mismatch("token", &other),
    }
}

pub(crate) fn expect_node(v: SemValue) -> Result<NodeId, BuildError> {
    match v {
        SemValue::Node(n) => Ok(n),
        other => mismatch("node", &other),
    }
}

pub(crate) fn expect_nodes(v: SemValue) -> Result<Vec<NodeId>, BuildError> {
    match v {
        SemValue::Nodes(n) => Ok(n),
        other => mismatch("node list", &other),
    }
}

pub(crate) fn expect_type(v: SemValue) -> Result<DataType, BuildError> {
    match v {
        SemValue::Type(t) => Ok(t),
        other => mismatch("data type", &other),
    }
}

pub(crate) fn expect_symbol(v: SemValue) -> Result<SymbolId, BuildError> {
    match v {
        SemValue::Symbol(s) => Ok(s),
        other => mismatch("symbol", &other),
    }
}

pub(crate) fn expect_path(v: SemValue) -> Result<Vec<String>, BuildError> {
    match v {
        SemValue::Path(p) => Ok(p),
        other => mismatch("symbol path", &other),
    }
}

pub(crate) fn expect_scope(v: SemValue) -> Result<ScopeId, BuildError> {
    match v {
        SemValue::Scope(s) => Ok(s),
        other => mismatch("scope", &other),
    }
}

pub(crate) fn expect_params(v: SemValue) -> Result<Vec<(String, DataType)>, BuildError> {
    match v {
        SemValue::Params(p) => Ok(p),
        other => mismatch("parameter list", &other),
    }
}

pub(crate) fn expect_specs(v: SemValue) -> Result<Vec<FuncSpec>, BuildError> {
    match v {
        SemValue::Specs(s) => Ok(s),
        other => mismatch("specifier list", &other),
    }
}

pub(crate) fn expect_overload(v: SemValue) -> Result<OverloadId, BuildError> {
    match v {
        SemValue::Overload(o) => Ok(o),
        other => mismatch("function overload", &other),
    }
}

pub(crate) fn expect_lambda_header(
    v: SemValue,
) -> Result<(ScopeId, Vec<SymbolId>), BuildError> {
    match v {
        SemValue::LambdaHeader(s, p) => Ok((s, p)),
        other => mismatch("lambda header", &other),
    }
}

fn mismatch<T>(expected: &str, got: &SemValue) -> Result<T, BuildError> {
    Err(BuildError::Ast(format!(
        "internal: expected {expected} on the value stack, got {got:?}"
    )))
}

// --- parser facade ------------------------------------------------------

/// The Celesta parser: token table, grammar and LR(1) table, ready to
/// run against an environment.
pub struct CelsParser {
    lexer: CelsLexer,
    parser: Lr1Parser,
    actions: Vec<Action>,
}

impl CelsParser {
    /// Build the grammar and its table from scratch.
    pub fn new() -> Result<Self, Error> {
        Self::construct(None)
    }

    /// Build the grammar, consulting the LR(1) table cache at `path`.
    pub fn with_cache(path: &Path) -> Result<Self, Error> {
        Self::construct(Some(path))
    }

    fn construct(cache: Option<&Path>) -> Result<Self, Error> {
        let lexer = CelsLexer::new()?;
        let (grammar, actions): (Grammar, Vec<Action>) = build_grammar(&lexer)?;
        let parser = match cache {
            Some(path) => Lr1Parser::with_cache(grammar, path)?,
            None => Lr1Parser::new(grammar)?,
        };
        tracing::debug!("grammar and LR(1) table ready");
        Ok(Self {
            lexer,
            parser,
            actions,
        })
    }

    pub fn lexer(&self) -> &CelsLexer {
        &self.lexer
    }

    /// Lex and parse one source text into `env`/`ast`. Returns the root
    /// block and the import paths encountered.
    pub fn parse_source(
        &self,
        env: &mut Env,
        ast: &mut Ast,
        text: &str,
    ) -> Result<(NodeId, Vec<String>), Error> {
        let tokens = self.lexer.parse(text)?;
        self.parse_tokens(env, ast, tokens)
    }

    /// Parse an already-lexed token stream.
    pub fn parse_tokens(
        &self,
        env: &mut Env,
        ast: &mut Ast,
        tokens: Vec<Token>,
    ) -> Result<(NodeId, Vec<String>), Error> {
        let lr_tokens: Vec<Lr1Token<SemValue>> = tokens
            .into_iter()
            .map(|t| Lr1Token {
                term: t.kind,
                lexeme: t.text.clone(),
                line: t.line,
                col: t.col,
                value: SemValue::Token(t),
            })
            .collect();

        let mut build = Build::new(env, ast);
        let actions = &self.actions;
        let result = self
            .parser
            .parse(lr_tokens, |rule, args| (actions[rule])(&mut build, args))?;

        let imports = std::mem::take(&mut build.imports);
        match result {
            SemValue::Node(root) => Ok((root, imports)),
            other => Err(Error::Build(BuildError::Ast(format!(
                "internal: parse produced {other:?} instead of a root node"
            )))),
        }
    }
}
