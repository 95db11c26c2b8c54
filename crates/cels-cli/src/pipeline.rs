//! Source discovery, import ordering and the compile loop.
//!
//! Imports are orchestrated ahead of parsing: every source's token
//! stream is pre-scanned for `import "path"` statements, the files are
//! ordered so that imports come first, and a cycle is an error. The
//! parser itself then sees imports as no-ops.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cels_compiler::Compiler;
use cels_compiler::tokens::TokenKind;

/// A compile failure, annotated with the file (and source text) it
/// occurred in when one is known.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{path}: {error}")]
    Compile {
        path: PathBuf,
        source_text: String,
        error: cels_compiler::Error,
    },

    #[error(transparent)]
    Setup(#[from] cels_compiler::Error),

    #[error("source directory {0} contains no .cels files")]
    NoSources(PathBuf),

    #[error("circular import involving {0}")]
    ImportCycle(PathBuf),

    #[error("{context}: {error}")]
    Io {
        context: String,
        error: std::io::Error,
    },
}

pub struct Options {
    pub dir: PathBuf,
    pub output: PathBuf,
    pub system_includes: Vec<String>,
    pub local_includes: Vec<String>,
    pub table_cache: PathBuf,
}

pub fn run(options: &Options) -> Result<(), CliError> {
    let sources = discover_sources(&options.dir)?;
    if sources.is_empty() {
        return Err(CliError::NoSources(options.dir.clone()));
    }
    tracing::info!(count = sources.len(), "sources discovered");

    let mut compiler = Compiler::with_table_cache(&options.table_cache)?;
    compiler.prologue.system_includes = options.system_includes.clone();
    compiler.prologue.local_includes = options.local_includes.clone();

    let texts = read_sources(&sources)?;
    let ordered = order_by_imports(&compiler, &options.dir, &sources, &texts)?;

    for path in &ordered {
        tracing::debug!(path = %path.display(), "compiling");
        let text = &texts[path];
        compiler
            .add_source(text)
            .map_err(|error| CliError::Compile {
                path: path.clone(),
                source_text: text.clone(),
                error,
            })?;
    }

    let output = compiler.finish()?;
    std::fs::write(&options.output, output).map_err(|error| CliError::Io {
        context: format!("writing {}", options.output.display()),
        error,
    })?;
    Ok(())
}

/// Every `.cels` file under `dir`, recursively, in sorted order.
fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut sources = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).map_err(|error| CliError::Io {
            context: format!("reading {}", current.display()),
            error,
        })?;
        for entry in entries {
            let entry = entry.map_err(|error| CliError::Io {
                context: format!("reading {}", current.display()),
                error,
            })?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "cels") {
                sources.push(path);
            }
        }
    }
    sources.sort();
    Ok(sources)
}

fn read_sources(sources: &[PathBuf]) -> Result<HashMap<PathBuf, String>, CliError> {
    let mut texts = HashMap::new();
    for path in sources {
        let text = std::fs::read_to_string(path).map_err(|error| CliError::Io {
            context: format!("reading {}", path.display()),
            error,
        })?;
        texts.insert(path.clone(), text);
    }
    Ok(texts)
}

/// Depth-first ordering over the import graph; a back edge is a cycle.
fn order_by_imports(
    compiler: &Compiler,
    dir: &Path,
    sources: &[PathBuf],
    texts: &HashMap<PathBuf, String>,
) -> Result<Vec<PathBuf>, CliError> {
    let mut imports: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for path in sources {
        let scanned = scan_imports(compiler, &texts[path]).map_err(|error| {
            CliError::Compile {
                path: path.clone(),
                source_text: texts[path].clone(),
                error,
            }
        })?;
        let resolved = scanned.into_iter().map(|p| dir.join(p)).collect();
        imports.insert(path.clone(), resolved);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<PathBuf, Mark> = HashMap::new();
    let mut ordered = Vec::with_capacity(sources.len());

    fn visit(
        path: &PathBuf,
        imports: &HashMap<PathBuf, Vec<PathBuf>>,
        marks: &mut HashMap<PathBuf, Mark>,
        ordered: &mut Vec<PathBuf>,
    ) -> Result<(), CliError> {
        match marks.get(path) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(CliError::ImportCycle(path.clone())),
            None => {}
        }
        marks.insert(path.clone(), Mark::Visiting);
        if let Some(deps) = imports.get(path) {
            for dep in deps {
                // imports of files outside the source set are reported
                // by the parser when the path fails to resolve
                if imports.contains_key(dep) {
                    visit(dep, imports, marks, ordered)?;
                }
            }
        }
        marks.insert(path.clone(), Mark::Done);
        ordered.push(path.clone());
        Ok(())
    }

    for path in sources {
        visit(path, &imports, &mut marks, &mut ordered)?;
    }
    Ok(ordered)
}

/// Token-level scan for `import "path"` pairs.
fn scan_imports(compiler: &Compiler, text: &str) -> Result<Vec<String>, cels_compiler::Error> {
    let lexer = compiler.lexer();
    let tokens = lexer.parse(text)?;
    let import_kind = lexer.kind_sym(TokenKind::KwImport);
    let string_kind = lexer.kind_sym(TokenKind::LiteralStr);

    let mut imports = Vec::new();
    for pair in tokens.windows(2) {
        if pair[0].kind == import_kind && pair[1].kind == string_kind {
            imports.push(unquote(&pair[1].text));
        }
    }
    Ok(imports)
}

/// Strip the quotes and escapes of a string literal lexeme.
fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn options(dir: &Path) -> Options {
        Options {
            dir: dir.to_path_buf(),
            output: dir.join("out.cpp"),
            system_includes: Vec::new(),
            local_includes: Vec::new(),
            table_cache: dir.join("cels_lr1.tbl"),
        }
    }

    #[test]
    fn compiles_a_directory_and_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.cels", "var x: int = 1;");
        run(&options(dir.path())).unwrap();
        let out = std::fs::read_to_string(dir.path().join("out.cpp")).unwrap();
        assert!(out.contains("int x;"));
        assert!(dir.path().join("cels_lr1.tbl").exists(), "table cache written");

        // a second run reuses the cache
        run(&options(dir.path())).unwrap();
    }

    #[test]
    fn imported_files_compile_before_importers() {
        let dir = tempfile::tempdir().unwrap();
        // `a.cels` sorts first but depends on `b.cels`
        write(
            dir.path(),
            "a.cels",
            indoc! {r#"
                import "b.cels";
                var y: int = b_value;
            "#},
        );
        write(dir.path(), "b.cels", "var b_value: int = 2;");
        run(&options(dir.path())).unwrap();
        let out = std::fs::read_to_string(dir.path().join("out.cpp")).unwrap();
        assert!(out.contains("int b_value;"));
        assert!(out.contains("int y;"));
    }

    #[test]
    fn import_cycles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.cels", r#"import "b.cels";"#);
        write(dir.path(), "b.cels", r#"import "a.cels";"#);
        let err = run(&options(dir.path())).unwrap_err();
        assert!(matches!(err, CliError::ImportCycle(_)));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&options(dir.path())).unwrap_err();
        assert!(matches!(err, CliError::NoSources(_)));
    }

    #[test]
    fn compile_errors_carry_the_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.cels", "var = 3;");
        let err = run(&options(dir.path())).unwrap_err();
        match err {
            CliError::Compile { path, .. } => {
                assert!(path.ends_with("bad.cels"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
