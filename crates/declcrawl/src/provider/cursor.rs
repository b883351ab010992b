//! The minimal cursor contract the normalizer consumes.
//!
//! A [`Cursor`] is one node of the provider's syntax tree: a kind, a
//! spelling, a source extent, an optional associated comment and its
//! children. Everything else clang knows stays behind this boundary.

use crate::provider::clang::{self, Clang, Node};
use crate::record::Access;

/// Closed set of cursor kinds the normalizer matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    StructDecl,
    UnionDecl,
    ClassDecl,
    EnumDecl,
    EnumConstantDecl,
    TypedefDecl,
    FieldDecl,
    VarDecl,
    FunctionDecl,
    Method,
    Constructor,
    Destructor,
    FriendDecl,
    UsingDecl,
    BaseSpecifier,
    Namespace,
    FunctionTemplate,
    ClassTemplate,
    TemplateTypeParam,
    TemplateNonTypeParam,
}

/// A concrete point in a source file, 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

/// The source extent of one cursor, 1-based and inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn contains(
        &self,
        line: u32,
        col: u32,
    ) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && col < self.start_col {
            return false;
        }
        if line == self.end_line && self.end_col > 0 && col > self.end_col {
            return false;
        }
        true
    }

    /// Unique textual key of this span, input to anonymous-identifier hashing.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}-{}:{}",
            self.file, self.start_line, self.start_col, self.end_line, self.end_col
        )
    }

    /// Slice the raw source text covered by this span.
    pub fn slice(
        &self,
        source: &str,
    ) -> Option<String> {
        if self.start_line == 0 {
            return None;
        }
        let lines: Vec<&str> = source.lines().collect();
        let first = self.start_line as usize - 1;
        let last = (self.end_line as usize - 1).min(lines.len().saturating_sub(1));
        if first >= lines.len() {
            return None;
        }
        let mut out = String::new();
        for (i, line) in lines[first..=last].iter().enumerate() {
            let mut text: &str = line;
            if i + first == last && self.end_col > 0 {
                let end = floor_boundary(text, self.end_col as usize);
                text = &text[..end];
            }
            if i == 0 && self.start_col > 1 {
                let start = floor_boundary(text, self.start_col as usize - 1);
                text = &text[start..];
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
        Some(out)
    }
}

/// Columns count bytes but may land inside a multi-byte character; back up
/// to the nearest char boundary so slicing stays valid.
fn floor_boundary(
    text: &str,
    idx: usize,
) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Fatal,
}

/// One compiler diagnostic, attached to cursors by extent overlap.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn overlaps(
        &self,
        span: &SourceSpan,
    ) -> bool {
        self.file == span.file && span.contains(self.line, self.col)
    }

    /// Diagnostics that mean the provider defaulted a member's type to `int`
    /// because the spelled type could not be resolved.
    pub fn is_unresolved_type(&self) -> bool {
        const MARKERS: &[&str] = &[
            "unknown type name",
            "has incomplete",
            "no type named",
            "no template named",
        ];
        MARKERS.iter().any(|m| self.message.contains(m))
    }
}

/// One node of the provider's syntax tree.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub kind: CursorKind,
    pub spelling: String,
    pub display_name: String,
    pub type_spelling: String,
    pub loc: SourceLoc,
    pub extent: SourceSpan,
    pub comment: Option<String>,
    pub is_definition: bool,
    pub access: Access,
    pub is_virtual: bool,
    pub is_static: bool,
    pub mangled: String,
    pub enum_value: Option<i64>,
    pub bitfield_width: Option<u32>,
    pub children: Vec<Cursor>,
}

impl Cursor {
    /// A bare cursor for tests and hand-built trees.
    pub fn new(
        kind: CursorKind,
        spelling: impl Into<String>,
    ) -> Self {
        let spelling = spelling.into();
        Self {
            kind,
            display_name: spelling.clone(),
            spelling,
            type_spelling: String::new(),
            loc: SourceLoc::default(),
            extent: SourceSpan::default(),
            comment: None,
            is_definition: true,
            access: Access::Unspecified,
            is_virtual: false,
            is_static: false,
            mangled: String::new(),
            enum_value: None,
            bitfield_width: None,
            children: Vec::new(),
        }
    }
}

/// Convert the top-level declarations of a parsed translation unit into
/// cursors, keeping only those located in `main_file`.
pub fn translation_unit_cursors(
    root: &Node,
    main_file: &str,
) -> Vec<Cursor> {
    let mut out = Vec::new();
    for child in &root.inner {
        if let Some(cursor) = convert(child, Access::Unspecified) {
            if cursor.loc.file == main_file || cursor.extent.file == main_file {
                out.push(cursor);
            }
        }
    }
    out
}

fn convert(
    node: &Node,
    access: Access,
) -> Option<Cursor> {
    let cursor = match &node.kind {
        Clang::RecordDecl(d) | Clang::CXXRecordDecl(d) => convert_record(node, d, access),
        Clang::EnumDecl(d) => {
            let mut c = decl_cursor(CursorKind::EnumDecl, d, access);
            c.children = convert_children(node, Access::Public);
            Some(c)
        },
        Clang::EnumConstantDecl(d) => {
            let mut c = decl_cursor(CursorKind::EnumConstantDecl, d, access);
            c.enum_value = d
                .value
                .as_ref()
                .and_then(json_int)
                .or_else(|| first_constant_value(node));
            c.comment = extract_comment(node);
            Some(c)
        },
        Clang::TypedefDecl(d) => {
            let mut c = decl_cursor(CursorKind::TypedefDecl, d, access);
            c.comment = extract_comment(node);
            Some(c)
        },
        Clang::FieldDecl(d) | Clang::IndirectFieldDecl(d) => {
            Some(convert_field(node, d, CursorKind::FieldDecl, access))
        },
        Clang::VarDecl(d) => Some(convert_field(node, d, CursorKind::VarDecl, access)),
        Clang::FunctionDecl(d) => Some(convert_function(node, d, CursorKind::FunctionDecl, access)),
        Clang::CXXMethodDecl(d) => Some(convert_function(node, d, CursorKind::Method, access)),
        Clang::CXXConstructorDecl(d) => {
            Some(convert_function(node, d, CursorKind::Constructor, access))
        },
        Clang::CXXDestructorDecl(d) => {
            Some(convert_function(node, d, CursorKind::Destructor, access))
        },
        Clang::FriendDecl(d) => {
            let mut c = decl_cursor(CursorKind::FriendDecl, d, access);
            c.children = convert_children(node, access);
            Some(c)
        },
        Clang::UsingDecl(d) => Some(decl_cursor(CursorKind::UsingDecl, d, access)),
        Clang::NamespaceDecl(d) => {
            let mut c = decl_cursor(CursorKind::Namespace, d, access);
            c.children = convert_children(node, Access::Unspecified);
            Some(c)
        },
        Clang::FunctionTemplateDecl(d) => {
            let mut c = decl_cursor(CursorKind::FunctionTemplate, d, access);
            c.children = convert_children(node, access);
            Some(c)
        },
        Clang::ClassTemplateDecl(d) | Clang::ClassTemplatePartialSpecializationDecl(d) => {
            let mut c = decl_cursor(CursorKind::ClassTemplate, d, access);
            c.children = convert_children(node, access);
            Some(c)
        },
        Clang::TemplateTypeParmDecl(d) => {
            Some(decl_cursor(CursorKind::TemplateTypeParam, d, access))
        },
        Clang::NonTypeTemplateParmDecl(d) => {
            Some(decl_cursor(CursorKind::TemplateNonTypeParam, d, access))
        },
        Clang::AccessSpecDecl(_)
        | Clang::FullComment(_)
        | Clang::ParagraphComment(_)
        | Clang::TextComment(_)
        | Clang::ConstantExpr(_)
        | Clang::Other {
            ..
        } => None,
    }?;
    Some(cursor)
}

fn convert_record(
    node: &Node,
    d: &clang::RecordData,
    access: Access,
) -> Option<Cursor> {
    if d.is_implicit.unwrap_or(false) {
        return None;
    }
    let kind = match d.tag_used.as_deref() {
        Some("union") => CursorKind::UnionDecl,
        Some("class") => CursorKind::ClassDecl,
        _ => CursorKind::StructDecl,
    };
    let name = d.name.clone().unwrap_or_default();
    let mut cursor = Cursor::new(kind, name);
    cursor.loc = to_loc(&d.loc);
    cursor.extent = to_span(&d.range, &cursor.loc);
    cursor.is_definition = d.complete_definition.unwrap_or(false);
    cursor.access = access;
    cursor.comment = extract_comment(node);

    // Base-class specifiers live in the `bases` array, not in `inner`;
    // surface them as leading child cursors so the walk stays uniform.
    for base in &d.bases {
        let mut b = Cursor::new(
            CursorKind::BaseSpecifier,
            base.ty.as_ref().map(|t| t.spelling().to_string()).unwrap_or_default(),
        );
        b.is_virtual = base.is_virtual.unwrap_or(false);
        b.access = parse_access(base.access.as_deref());
        b.loc = cursor.loc.clone();
        b.extent = cursor.extent.clone();
        cursor.children.push(b);
    }

    let default_access = if kind == CursorKind::ClassDecl {
        Access::Private
    } else {
        Access::Public
    };
    cursor.children.extend(convert_children(node, default_access));
    Some(cursor)
}

/// Convert a node's children, tracking the running access level set by
/// `AccessSpecDecl` markers.
fn convert_children(
    node: &Node,
    default_access: Access,
) -> Vec<Cursor> {
    let mut access = default_access;
    let mut out = Vec::new();
    for child in &node.inner {
        if let Clang::AccessSpecDecl(a) = &child.kind {
            access = parse_access(a.access.as_deref());
            continue;
        }
        if let Some(cursor) = convert(child, access) {
            out.push(cursor);
        }
    }
    out
}

fn convert_field(
    node: &Node,
    d: &clang::FieldData,
    kind: CursorKind,
    access: Access,
) -> Cursor {
    let mut cursor = Cursor::new(kind, d.name.clone().unwrap_or_default());
    cursor.loc = to_loc(&d.loc);
    cursor.extent = to_span(&d.range, &cursor.loc);
    cursor.type_spelling = d.ty.as_ref().map(|t| t.spelling().to_string()).unwrap_or_default();
    cursor.access = access;
    cursor.is_static = d.storage_class.as_deref() == Some("static");
    cursor.mangled = d.mangled_name.clone().unwrap_or_default();
    cursor.comment = extract_comment(node);
    if d.is_bitfield.unwrap_or(false) {
        cursor.bitfield_width = first_constant_value(node).and_then(|v| u32::try_from(v).ok());
    }
    cursor
}

fn convert_function(
    node: &Node,
    d: &clang::FunctionData,
    kind: CursorKind,
    access: Access,
) -> Cursor {
    let mut cursor = Cursor::new(kind, d.name.clone().unwrap_or_default());
    cursor.loc = to_loc(&d.loc);
    cursor.extent = to_span(&d.range, &cursor.loc);
    cursor.type_spelling = d.ty.as_ref().map(|t| t.spelling().to_string()).unwrap_or_default();
    cursor.access = access;
    cursor.is_virtual = d.is_virtual.unwrap_or(false);
    cursor.is_static = d.storage_class.as_deref() == Some("static");
    cursor.mangled = d.mangled_name.clone().unwrap_or_default();
    cursor.comment = extract_comment(node);
    cursor
}

fn decl_cursor(
    kind: CursorKind,
    d: &clang::DeclData,
    access: Access,
) -> Cursor {
    let mut cursor = Cursor::new(kind, d.name.clone().unwrap_or_default());
    cursor.loc = to_loc(&d.loc);
    cursor.extent = to_span(&d.range, &cursor.loc);
    cursor.type_spelling = d.ty.as_ref().map(|t| t.spelling().to_string()).unwrap_or_default();
    cursor.access = access;
    cursor
}

fn parse_access(s: Option<&str>) -> Access {
    match s {
        Some("public") => Access::Public,
        Some("protected") => Access::Protected,
        Some("private") => Access::Private,
        _ => Access::Unspecified,
    }
}

fn to_loc(loc: &Option<clang_ast::SourceLocation>) -> SourceLoc {
    match loc.as_ref().and_then(clang::resolve_loc) {
        Some(bare) => SourceLoc {
            file: bare.file.to_string(),
            line: bare.line as u32,
            col: bare.col as u32,
        },
        None => SourceLoc::default(),
    }
}

fn to_span(
    range: &Option<clang_ast::SourceRange>,
    fallback: &SourceLoc,
) -> SourceSpan {
    let begin = range.as_ref().and_then(|r| clang::resolve_loc(&r.begin));
    let end = range.as_ref().and_then(|r| clang::resolve_loc(&r.end));
    match (begin, end) {
        (Some(b), Some(e)) => SourceSpan {
            file: b.file.to_string(),
            start_line: b.line as u32,
            start_col: b.col as u32,
            end_line: e.line as u32,
            end_col: (e.col + e.tok_len) as u32,
        },
        _ => SourceSpan {
            file: fallback.file.clone(),
            start_line: fallback.line,
            start_col: fallback.col,
            end_line: fallback.line,
            end_col: 0,
        },
    }
}

/// Gather the text of a declaration's documentation comment, if any.
fn extract_comment(node: &Node) -> Option<String> {
    fn collect(
        node: &Node,
        out: &mut Vec<String>,
    ) {
        if let Clang::TextComment(c) = &node.kind {
            if let Some(text) = &c.text {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
        }
        for child in &node.inner {
            collect(child, out);
        }
    }

    for child in &node.inner {
        if let Clang::FullComment(_) = &child.kind {
            let mut parts = Vec::new();
            collect(child, &mut parts);
            if !parts.is_empty() {
                return Some(parts.join(" "));
            }
        }
    }
    None
}

fn first_constant_value(node: &Node) -> Option<i64> {
    for child in &node.inner {
        if let Clang::ConstantExpr(v) = &child.kind {
            if let Some(value) = v.value.as_ref().and_then(json_int) {
                return Some(value);
            }
        }
        if let Some(value) = first_constant_value(child) {
            return Some(value);
        }
    }
    None
}

fn json_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
