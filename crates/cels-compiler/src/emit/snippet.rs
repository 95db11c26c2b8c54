//! Accumulating C++ text with the headers it needs.

/// A piece of generated C++ plus the include headers it requires.
#[derive(Clone, Debug, Default)]
pub struct CppSnippet {
    code: String,
    headers: Vec<String>,
}

impl CppSnippet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            headers: Vec::new(),
        }
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn push(&mut self, text: &str) {
        self.code.push_str(text);
    }

    pub fn push_snippet(&mut self, other: CppSnippet) {
        self.code.push_str(&other.code);
        for header in other.headers {
            self.require(header);
        }
    }

    pub fn require(&mut self, header: String) {
        if !self.headers.contains(&header) {
            self.headers.push(header);
        }
    }

    /// The same snippet with every line indented one level.
    pub fn indented(&self) -> CppSnippet {
        CppSnippet {
            code: indent(&self.code),
            headers: self.headers.clone(),
        }
    }
}

/// Indent every non-empty line by four spaces.
pub fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    // lines() drops a trailing newline; don't invent one
    if !text.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippets_concatenate_and_merge_headers() {
        let mut a = CppSnippet::text("int x;\n");
        let mut b = CppSnippet::text("int y;\n");
        b.require("<vector>".to_owned());
        a.push_snippet(b);
        a.require("<vector>".to_owned());
        assert_eq!(a.code(), "int x;\nint y;\n");
        assert_eq!(a.headers(), ["<vector>"]);
    }

    #[test]
    fn indentation_skips_blank_lines() {
        assert_eq!(indent("a\n\nb\n"), "    a\n\n    b\n");
    }
}
