//! The whole pipeline behind one façade: lex, parse, lower, emit.

use std::path::Path;

use crate::Result;
use crate::ast::{Ast, NodeId};
use crate::build::CelsParser;
use crate::emit::{Prologue, emit_env};
use crate::env::Env;
use crate::multiframe::extract_multiframe_calls;
use crate::tokens::CelsLexer;

/// A compilation in progress: one environment shared by every source
/// added, then a single emission.
pub struct Compiler {
    parser: CelsParser,
    env: Env,
    ast: Ast,
    roots: Vec<NodeId>,
    pub prologue: Prologue,
}

impl Compiler {
    pub fn new() -> Result<Self> {
        Ok(Self::assemble(CelsParser::new()?))
    }

    /// Like `new`, reusing a persisted LR(1) table when it is current.
    pub fn with_table_cache(path: &Path) -> Result<Self> {
        Ok(Self::assemble(CelsParser::with_cache(path)?))
    }

    fn assemble(parser: CelsParser) -> Self {
        Self {
            parser,
            env: Env::default_env(),
            ast: Ast::new(),
            roots: Vec::new(),
            prologue: Prologue::default(),
        }
    }

    pub fn lexer(&self) -> &CelsLexer {
        self.parser.lexer()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Parse one source text into the shared environment. Returns the
    /// import paths the source mentions.
    pub fn add_source(&mut self, text: &str) -> Result<Vec<String>> {
        let (root, imports) = self
            .parser
            .parse_source(&mut self.env, &mut self.ast, text)?;
        self.roots.push(root);
        tracing::debug!(imports = imports.len(), "source parsed");
        Ok(imports)
    }

    /// Lower multiframe calls and emit the translation unit.
    pub fn finish(mut self) -> Result<String> {
        for root in self.roots.clone() {
            extract_multiframe_calls(&mut self.env, &mut self.ast, root)?;
        }
        let output = emit_env(&self.env, &mut self.ast, &self.roots, &self.prologue)?;
        tracing::info!(bytes = output.len(), "emission complete");
        Ok(output)
    }

    /// Convenience for one-shot compilations.
    pub fn compile_source(text: &str) -> Result<String> {
        let mut compiler = Self::new()?;
        compiler.add_source(text)?;
        compiler.finish()
    }
}
