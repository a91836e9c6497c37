//! Line-oriented C++ source buffer.

/// One output file under construction.
///
/// Lines are indented by the current level; `#include`s are collected
/// separately and de-duplicated, then rendered ahead of the body.
#[derive(Debug, Clone)]
pub struct CSourceWriter {
    path: String,
    is_header: bool,
    indent_unit: String,
    indent_level: usize,
    includes: Vec<String>,
    body: String,
}

impl CSourceWriter {
    pub fn new<S: Into<String>>(path: S, is_header: bool, indent_unit: &str) -> Self {
        Self {
            path: path.into(),
            is_header,
            indent_unit: indent_unit.to_string(),
            indent_level: 0,
            includes: Vec::new(),
            body: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_header(&self) -> bool {
        self.is_header
    }

    // ========== Body ==========

    pub fn write_line(&mut self, line: &str) {
        if !line.is_empty() {
            for _ in 0..self.indent_level {
                self.body.push_str(&self.indent_unit);
            }
            self.body.push_str(line);
        }
        self.body.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.body.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write `open`, run `body` one level deeper, then write `close`
    pub fn indented<R>(&mut self, open: &str, close: &str, body: impl FnOnce(&mut Self) -> R) -> R {
        self.write_line(open);
        self.indent();
        let result = body(self);
        self.dedent();
        self.write_line(close);
        result
    }

    // ========== Includes ==========

    /// Add an include; `<...>` for system headers. Returns false for a repeat.
    pub fn include(&mut self, header: &str) -> bool {
        if self.includes.iter().any(|h| h == header) {
            return false;
        }
        self.includes.push(header.to_string());
        true
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.is_header {
            out.push_str("#pragma once\n\n");
        }
        for header in &self.includes {
            if header.starts_with('<') {
                out.push_str(&format!("#include {}\n", header));
            } else {
                out.push_str(&format!("#include \"{}\"\n", header));
            }
        }
        if !self.includes.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.body);
        out
    }
}
