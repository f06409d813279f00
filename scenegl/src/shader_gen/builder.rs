//! Typed GLSL stage builder
//!
//! A stage is assembled from four kinds of records that are emitted in a
//! fixed section order regardless of insertion order:
//!
//! 1. directives (`#extension`, `precision`, `#define`)
//! 2. declarations (`attribute` / `uniform` / `varying`)
//! 3. definitions (structs, constants and functions)
//! 4. statements of `main`
//!
//! Because declarations always precede definitions and `main`, any global can
//! be referenced from any function or statement. Records are de-duplicated by
//! name, so independent feature blocks may request the same declaration.

use std::fmt;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage qualifier of a global declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Attribute,
    Uniform,
    Varying,
}

impl Qualifier {
    fn keyword(self) -> &'static str {
        match self {
            Qualifier::Attribute => "attribute",
            Qualifier::Uniform => "uniform",
            Qualifier::Varying => "varying",
        }
    }
}

/// A global `attribute` / `uniform` / `varying`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub qualifier: Qualifier,
    pub ty: &'static str,
    pub name: String,
}

#[derive(Debug, Clone)]
struct Definition {
    name: String,
    source: String,
}

/// Builder for one shader stage
#[derive(Debug, Clone)]
pub struct StageBuilder {
    stage: Stage,
    directives: Vec<String>,
    declarations: Vec<Declaration>,
    definitions: Vec<Definition>,
    statements: Vec<String>,
    depth: usize,
}

impl StageBuilder {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            directives: Vec::new(),
            declarations: Vec::new(),
            definitions: Vec::new(),
            statements: Vec::new(),
            depth: 1,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Preprocessor or precision line
    pub fn directive(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !self.directives.contains(&line) {
            self.directives.push(line);
        }
    }

    pub fn attribute(&mut self, ty: &'static str, name: impl Into<String>) {
        self.declare(Qualifier::Attribute, ty, name.into());
    }

    pub fn uniform(&mut self, ty: &'static str, name: impl Into<String>) {
        self.declare(Qualifier::Uniform, ty, name.into());
    }

    pub fn varying(&mut self, ty: &'static str, name: impl Into<String>) {
        self.declare(Qualifier::Varying, ty, name.into());
    }

    fn declare(&mut self, qualifier: Qualifier, ty: &'static str, name: String) {
        if let Some(existing) = self.declarations.iter().find(|d| d.name == name) {
            debug_assert!(
                existing.qualifier == qualifier && existing.ty == ty,
                "conflicting declarations of {name}"
            );
            return;
        }
        self.declarations.push(Declaration {
            qualifier,
            ty,
            name,
        });
    }

    /// Struct, constant or function definition. Later requests for the same
    /// name are ignored.
    pub fn define(&mut self, name: &str, source: impl Into<String>) {
        if self.definitions.iter().any(|d| d.name == name) {
            return;
        }
        self.definitions.push(Definition {
            name: name.to_string(),
            source: source.into(),
        });
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Statement in `main` at the current block depth
    pub fn stmt(&mut self, line: impl AsRef<str>) {
        let indent = "    ".repeat(self.depth);
        self.statements.push(format!("{indent}{}", line.as_ref()));
    }

    /// Open a block: `header {`
    pub fn open(&mut self, header: impl AsRef<str>) {
        self.stmt(format!("{} {{", header.as_ref()));
        self.depth += 1;
    }

    /// Close the innermost block
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1).max(1);
        self.stmt("}");
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Declarations never referenced by a definition or statement.
    ///
    /// Only textual references count; a variable read inside a function that
    /// is itself never called still counts as used.
    pub fn unused_declarations(&self) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|decl| {
                !self
                    .definitions
                    .iter()
                    .any(|def| contains_identifier(&def.source, &decl.name))
                    && !self
                        .statements
                        .iter()
                        .any(|stmt| contains_identifier(stmt, &decl.name))
            })
            .map(|decl| decl.name.as_str())
            .collect()
    }

    /// Emit the stage as source lines
    pub fn finish(self) -> Vec<String> {
        let mut lines = Vec::with_capacity(
            self.directives.len() + self.declarations.len() + self.statements.len() + 16,
        );
        lines.extend(self.directives);

        for decl in &self.declarations {
            lines.push(format!(
                "{} {} {};",
                decl.qualifier.keyword(),
                decl.ty,
                decl.name
            ));
        }

        for def in &self.definitions {
            lines.extend(def.source.lines().map(str::to_string));
        }

        lines.push("void main(void) {".to_string());
        lines.extend(self.statements);
        lines.push("}".to_string());
        lines
    }
}

/// Whole-word search for a GLSL identifier
pub(crate) fn contains_identifier(haystack: &str, ident: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    haystack.match_indices(ident).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + ident.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_emitted_in_fixed_order() {
        let mut b = StageBuilder::new(Stage::Fragment);
        b.stmt("gl_FragColor = vec4(tint(color), 1.0);");
        b.define("tint", "vec3 tint(vec3 c) {\n    return c * gain;\n}");
        b.uniform("vec3", "color");
        b.uniform("float", "gain");
        b.directive("precision highp float;");

        let lines = b.finish();
        assert_eq!(lines[0], "precision highp float;");
        assert_eq!(lines[1], "uniform vec3 color;");
        assert_eq!(lines[2], "uniform float gain;");
        assert_eq!(lines[3], "vec3 tint(vec3 c) {");
        assert_eq!(lines[6], "void main(void) {");
        assert_eq!(lines[7], "    gl_FragColor = vec4(tint(color), 1.0);");
        assert_eq!(lines.last().map(String::as_str), Some("}"));
    }

    #[test]
    fn test_duplicate_records_are_dropped() {
        let mut b = StageBuilder::new(Stage::Vertex);
        b.uniform("mat4", "viewMatrix");
        b.uniform("mat4", "viewMatrix");
        b.define("f", "void f() {}");
        b.define("f", "void f() { }");
        b.directive("precision highp float;");
        b.directive("precision highp float;");
        assert_eq!(b.declarations().len(), 1);
        assert_eq!(b.finish().len(), 1 + 1 + 1 + 2);
    }

    #[test]
    fn test_blocks_indent_statements() {
        let mut b = StageBuilder::new(Stage::Fragment);
        b.open("if (x > 1.0)");
        b.stmt("discard;");
        b.close();
        let lines = b.finish();
        assert_eq!(lines[1], "    if (x > 1.0) {");
        assert_eq!(lines[2], "        discard;");
        assert_eq!(lines[3], "    }");
    }

    #[test]
    fn test_unused_declarations_use_whole_words() {
        let mut b = StageBuilder::new(Stage::Fragment);
        b.uniform("vec3", "lightColor1");
        b.uniform("vec3", "lightColor10");
        b.stmt("vec3 c = lightColor10;");
        assert_eq!(b.unused_declarations(), vec!["lightColor1"]);
    }

    #[test]
    fn test_identifier_search_respects_boundaries() {
        assert!(contains_identifier("a = uv.st;", "uv"));
        assert!(!contains_identifier("a = vUV;", "UV"));
        assert!(!contains_identifier("shadowMap01", "shadowMap0"));
    }
}
