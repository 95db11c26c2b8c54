//! Rendering compile errors with a window into the offending source.

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use cels_core::{LexError, ParseError};
use cels_compiler::Error;

use crate::pipeline::CliError;

/// Render an error for stderr. Errors that carry a source position get
/// an annotated snippet; everything else is a plain message.
pub fn render(error: &CliError) -> String {
    match error {
        CliError::Compile {
            path,
            source_text,
            error,
        } => match position_of(error) {
            Some((line, col, message)) => render_snippet(
                source_text,
                &path.display().to_string(),
                line,
                col,
                &message,
            ),
            None => format!("error: {error}\n"),
        },
        other => format!("error: {other}\n"),
    }
}

/// Extract `(line, col, message)` from errors that carry a position.
fn position_of(error: &Error) -> Option<(u32, u32, String)> {
    match error {
        Error::Lex(LexError::InvalidToken { line, col }) => {
            Some((*line, *col, "invalid token".to_owned()))
        }
        Error::Lex(LexError::Adjacency { message, line, col }) => {
            Some((*line, *col, message.clone()))
        }
        Error::Parse(ParseError::UnexpectedToken { line, col, lexeme }) => {
            Some((*line, *col, format!("unexpected token `{lexeme}`")))
        }
        Error::Parse(ParseError::Action {
            line,
            col,
            message,
            ..
        }) => Some((*line, *col, message.clone())),
        _ => None,
    }
}

fn render_snippet(source: &str, path: &str, line: u32, col: u32, message: &str) -> String {
    let Some(span) = byte_span(source, line, col) else {
        return format!("error: {path}:{line}:{col}: {message}\n");
    };

    let snippet = Snippet::source(source)
        .line_start(1)
        .path(path)
        .annotation(AnnotationKind::Primary.span(span).label(message));
    let report = [Level::ERROR.primary_title(message).element(snippet)];
    format!("{}\n", Renderer::plain().render(&report))
}

/// Byte range of the character at a 1-based line/column.
fn byte_span(source: &str, line: u32, col: u32) -> Option<std::ops::Range<usize>> {
    let mut current_line = 1;
    let mut current_col = 1;
    for (offset, c) in source.char_indices() {
        if current_line == line && current_col == col {
            return Some(offset..offset + c.len_utf8());
        }
        if c == '\n' {
            current_line += 1;
            current_col = 1;
        } else {
            current_col += 1;
        }
    }
    (current_line == line && current_col == col).then(|| source.len()..source.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compile_error(source: &str) -> CliError {
        let mut compiler = cels_compiler::Compiler::new().unwrap();
        let error = compiler.add_source(source).unwrap_err();
        CliError::Compile {
            path: PathBuf::from("test.cels"),
            source_text: source.to_owned(),
            error,
        }
    }

    #[test]
    fn syntax_errors_render_with_source_context() {
        let rendered = render(&compile_error("var = 3;"));
        assert!(rendered.contains("test.cels"));
        assert!(rendered.contains("var = 3;"));
        assert!(rendered.contains("unexpected token `=`"));
    }

    #[test]
    fn type_errors_render_the_action_message() {
        let rendered = render(&compile_error("var b: bool = 1;"));
        assert!(rendered.contains("could not convert"));
    }

    #[test]
    fn io_errors_render_plainly() {
        let error = CliError::NoSources(PathBuf::from("/tmp/empty"));
        let rendered = render(&error);
        assert!(rendered.starts_with("error:"));
        assert!(rendered.contains("/tmp/empty"));
    }

    #[test]
    fn byte_span_finds_positions() {
        let source = "ab\ncd";
        assert_eq!(byte_span(source, 1, 1), Some(0..1));
        assert_eq!(byte_span(source, 2, 1), Some(3..4));
        assert_eq!(byte_span(source, 2, 2), Some(4..5));
        assert_eq!(byte_span(source, 9, 9), None);
    }
}
