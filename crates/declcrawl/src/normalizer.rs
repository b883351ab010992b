//! Converts provider cursors into canonical records.
//!
//! One crawl invocation walks the top-level cursors of a translation unit,
//! producing one record per declaration plus one record per nested or
//! anonymous type definition (scoped to its enclosing record via `src`).
//! Every record is stamped with the crawl tag and source file.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::descriptor::anonymous_key;
use crate::provider::cursor::{Cursor, CursorKind, Diagnostic, SourceLoc};
use crate::provider::CrawlOutput;
use crate::record::{Access, ClassMember, Field, MemberQualifier, Record, RecordPayload};

#[derive(Debug)]
pub enum NormalizeError {
    /// Strict mode: a member's declared type could not be resolved by the
    /// provider.
    UnresolvedType {
        file: String,
        line: u32,
        member: String,
        message: String,
    },
}

impl std::fmt::Display for NormalizeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::UnresolvedType {
                file,
                line,
                member,
                message,
            } => {
                write!(f, "{file}:{line}: unresolved type for '{member}': {message}")
            },
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Options for one normalization run.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Fail the file on unresolved member types instead of reconstructing
    /// them from the raw source text.
    pub strict: bool,
    /// Grouping label stamped on every record of this crawl.
    pub tag: Option<String>,
}

/// Normalize one crawled file into records, later entries replacing earlier
/// ones with the same identifier.
pub fn normalize(
    output: &CrawlOutput,
    opts: &CrawlOptions,
) -> Result<Vec<Record>, NormalizeError> {
    let normalizer = Normalizer::new(output, opts);
    normalizer.run()
}

struct Normalizer<'a> {
    output: &'a CrawlOutput,
    opts: &'a CrawlOptions,
    anon_marker_re: Regex,
    attribute_re: Regex,
}

impl<'a> Normalizer<'a> {
    fn new(
        output: &'a CrawlOutput,
        opts: &'a CrawlOptions,
    ) -> Self {
        Self {
            output,
            opts,
            anon_marker_re: Regex::new(r"\((?:anonymous|unnamed)[^()]*\)").unwrap(),
            attribute_re: Regex::new(r"__attribute__.*").unwrap(),
        }
    }

    fn run(&self) -> Result<Vec<Record>, NormalizeError> {
        let mut records = Vec::new();
        for cursor in &self.output.cursors {
            self.handle(cursor, None, &mut records)?;
        }
        for mac in &self.output.macros {
            records.push(Record::new(
                mac.name.clone(),
                self.output.main_file.clone(),
                RecordPayload::Macro {
                    body: mac.body.clone(),
                },
            ));
        }

        // Later definitions replace earlier ones with the same identifier.
        let mut deduped: Vec<Record> = Vec::with_capacity(records.len());
        for mut record in records {
            record.tag = self.opts.tag.clone();
            if record.source_file.is_empty() {
                record.source_file = self.output.main_file.clone();
            }
            if let Some(existing) = deduped.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
            } else {
                deduped.push(record);
            }
        }
        debug!("{}: normalized {} records", self.output.main_file, deduped.len());
        Ok(deduped)
    }

    /// Dispatch one cursor; nested type definitions are appended to
    /// `records` with `src` pointing at the enclosing identifier.
    fn handle(
        &self,
        cursor: &Cursor,
        enclosing: Option<&str>,
        records: &mut Vec<Record>,
    ) -> Result<Option<String>, NormalizeError> {
        let produced = match cursor.kind {
            CursorKind::StructDecl | CursorKind::UnionDecl | CursorKind::ClassDecl => {
                Some(self.handle_structured(cursor, records)?)
            },
            CursorKind::EnumDecl => Some(self.handle_enum(cursor)),
            CursorKind::TypedefDecl => self.handle_typedef(cursor)?,
            CursorKind::FunctionDecl => self.handle_function(cursor)?,
            CursorKind::FunctionTemplate | CursorKind::ClassTemplate => {
                self.handle_template(cursor, records)?
            },
            CursorKind::Namespace => Some(self.handle_namespace(cursor, records)?),
            _ => None,
        };
        match produced {
            Some(mut record) => {
                if enclosing.is_some() {
                    record.src = enclosing.map(str::to_string);
                }
                let id = record.id.clone();
                records.push(record);
                Ok(Some(id))
            },
            None => Ok(None),
        }
    }

    /// Struct/union/class bodies. In C++ mode every structured type becomes a
    /// class record, matching the richer member shape the language needs.
    fn handle_structured(
        &self,
        cursor: &Cursor,
        records: &mut Vec<Record>,
    ) -> Result<Record, NormalizeError> {
        let kind_word = match cursor.kind {
            CursorKind::UnionDecl => "union",
            CursorKind::ClassDecl => "class",
            _ => "struct",
        };
        let identifier = self.structured_identifier(kind_word, cursor);
        let is_class = self.output.cxx || cursor.kind == CursorKind::ClassDecl;
        debug!("structured {identifier}");

        let mut fields: Vec<Field> = Vec::new();
        let mut members: Vec<ClassMember> = Vec::new();
        // Identifier of a just-registered nested definition whose phantom
        // field entry may be replaced by the real member that follows it.
        let mut pending_nested: Option<String> = None;

        for child in &cursor.children {
            match child.kind {
                CursorKind::StructDecl
                | CursorKind::UnionDecl
                | CursorKind::ClassDecl
                | CursorKind::EnumDecl => {
                    if let Some(nested_id) = self.handle(child, Some(&identifier), records)? {
                        if !is_class {
                            fields.push(Field::new(nested_id.clone(), ""));
                            pending_nested = Some(nested_id);
                        }
                    }
                },
                CursorKind::BaseSpecifier => {
                    members.push(ClassMember::Parent {
                        name: child.spelling.clone(),
                        virtual_: child.is_virtual,
                        access: child.access,
                    });
                },
                CursorKind::UsingDecl => {
                    let mut path: Vec<String> =
                        child.spelling.split("::").map(str::to_string).collect();
                    let name = path.pop().unwrap_or_default();
                    members.push(ClassMember::Using {
                        path,
                        name,
                    });
                },
                CursorKind::FieldDecl
                | CursorKind::VarDecl
                | CursorKind::Method
                | CursorKind::Constructor
                | CursorKind::Destructor => {
                    let ty = self.member_type(child)?;
                    if is_class {
                        let qualifier = if child.is_virtual {
                            MemberQualifier::Virtual
                        } else if child.is_static || child.kind == CursorKind::VarDecl {
                            MemberQualifier::Static
                        } else {
                            MemberQualifier::None
                        };
                        members.push(ClassMember::Data {
                            qualifier,
                            ty,
                            mangled: child.mangled.clone(),
                            name: child.spelling.clone(),
                            access: child.access,
                            comment: child.comment.clone(),
                        });
                    } else {
                        // The provider emits both a type definition and an
                        // unnamed field for anonymous members; keep only the
                        // field.
                        if pending_nested.as_deref() == Some(ty.as_str()) {
                            fields.pop();
                        }
                        pending_nested = None;
                        fields.push(Field {
                            ty,
                            name: child.spelling.clone(),
                            comment: child.comment.clone(),
                        });
                    }
                },
                CursorKind::FriendDecl => {
                    for friend in &child.children {
                        members.push(ClassMember::Data {
                            qualifier: MemberQualifier::Friend,
                            ty: friend.type_spelling.clone(),
                            mangled: friend.mangled.clone(),
                            name: friend.spelling.clone(),
                            access: Access::Unspecified,
                            comment: child.comment.clone(),
                        });
                    }
                },
                _ => {},
            }
        }

        let payload = if is_class {
            RecordPayload::Class {
                members,
            }
        } else if cursor.kind == CursorKind::UnionDecl {
            RecordPayload::Union {
                fields,
            }
        } else {
            RecordPayload::Struct {
                fields,
            }
        };
        Ok(Record::new(identifier, cursor.extent.file.clone(), payload))
    }

    fn handle_enum(
        &self,
        cursor: &Cursor,
    ) -> Record {
        let identifier = self.structured_identifier("enum", cursor);
        let mut values = BTreeMap::new();
        let mut next = 0i64;
        for child in &cursor.children {
            if child.kind != CursorKind::EnumConstantDecl {
                continue;
            }
            let value = child.enum_value.unwrap_or(next);
            next = value + 1;
            values.insert(child.spelling.clone(), value);
        }
        Record::new(
            identifier,
            cursor.extent.file.clone(),
            RecordPayload::Enum {
                values,
            },
        )
    }

    fn handle_typedef(
        &self,
        cursor: &Cursor,
    ) -> Result<Option<Record>, NormalizeError> {
        if cursor.spelling.is_empty() {
            return Ok(None);
        }
        let underlying = self.uniq_typename(&self.member_type(cursor)?);
        Ok(Some(Record::new(
            cursor.spelling.clone(),
            cursor.extent.file.clone(),
            RecordPayload::Typedef {
                underlying,
            },
        )))
    }

    fn handle_function(
        &self,
        cursor: &Cursor,
    ) -> Result<Option<Record>, NormalizeError> {
        if cursor.spelling.is_empty() {
            return Ok(None);
        }
        let proto = self.member_type(cursor)?;
        let prototype = self.attribute_re.replace(&proto, "").trim().to_string();
        Ok(Some(Record::new(
            cursor.spelling.clone(),
            cursor.extent.file.clone(),
            RecordPayload::Function {
                prototype,
            },
        )))
    }

    /// Template declarations wrap an embedded class or function record and
    /// keep only true type/non-type template parameters.
    fn handle_template(
        &self,
        cursor: &Cursor,
        records: &mut Vec<Record>,
    ) -> Result<Option<Record>, NormalizeError> {
        let params: Vec<String> = cursor
            .children
            .iter()
            .filter(|c| {
                matches!(
                    c.kind,
                    CursorKind::TemplateTypeParam | CursorKind::TemplateNonTypeParam
                )
            })
            .map(|c| c.spelling.clone())
            .collect();

        if cursor.kind == CursorKind::ClassTemplate {
            let Some(body_cursor) = cursor.children.iter().find(|c| {
                matches!(
                    c.kind,
                    CursorKind::StructDecl | CursorKind::UnionDecl | CursorKind::ClassDecl
                )
            }) else {
                return Ok(None);
            };
            let kind_word = match body_cursor.kind {
                CursorKind::UnionDecl => "union",
                CursorKind::ClassDecl => "class",
                _ => "struct",
            };
            let identifier = format!("{kind_word} {}", cursor.display_name);
            let body = self.handle_structured(body_cursor, records)?;
            return Ok(Some(Record::new(
                identifier,
                cursor.extent.file.clone(),
                RecordPayload::Template {
                    params,
                    body: Box::new(body),
                },
            )));
        }

        let Some(func) = cursor.children.iter().find(|c| c.kind == CursorKind::FunctionDecl)
        else {
            return Ok(None);
        };
        let Some(body) = self.handle_function(func)? else {
            return Ok(None);
        };
        Ok(Some(Record::new(
            cursor.display_name.clone(),
            cursor.extent.file.clone(),
            RecordPayload::Template {
                params,
                body: Box::new(body),
            },
        )))
    }

    fn handle_namespace(
        &self,
        cursor: &Cursor,
        records: &mut Vec<Record>,
    ) -> Result<Record, NormalizeError> {
        let namespace = cursor.spelling.clone();
        let mut local = Vec::new();
        for child in &cursor.children {
            if let Some(id) = self.handle(child, Some(&namespace), records)? {
                local.push(id);
            }
        }
        Ok(Record::new(
            namespace,
            cursor.extent.file.clone(),
            RecordPayload::Namespace {
                local,
            },
        ))
    }

    /// Kind-prefixed identifier, synthesized from the declaration's source
    /// location when the cursor has no stable name.
    fn structured_identifier(
        &self,
        kind_word: &str,
        cursor: &Cursor,
    ) -> String {
        if cursor.spelling.is_empty() {
            return anonymous_key(kind_word, &loc_key(&cursor.loc));
        }
        let name = cursor.spelling.rsplit("::").next().unwrap_or(&cursor.spelling);
        format!("{kind_word} {name}")
    }

    /// Resolve a member's declared type, falling back to raw-source
    /// reconstruction when the provider defaulted it after an unresolved-type
    /// diagnostic.
    fn member_type(
        &self,
        cursor: &Cursor,
    ) -> Result<String, NormalizeError> {
        let unresolved: Option<&Diagnostic> = self
            .output
            .diagnostics
            .iter()
            .find(|d| d.is_unresolved_type() && d.overlaps(&cursor.extent));

        let spelling = match unresolved {
            None => cursor.type_spelling.clone(),
            Some(diag) => {
                if self.opts.strict {
                    return Err(NormalizeError::UnresolvedType {
                        file: cursor.extent.file.clone(),
                        line: cursor.loc.line,
                        member: cursor.spelling.clone(),
                        message: diag.message.clone(),
                    });
                }
                match cursor.extent.slice(&self.output.source) {
                    Some(raw) => recover_type_spelling(&raw, &cursor.spelling),
                    None => cursor.type_spelling.clone(),
                }
            },
        };
        let mut ty = self.uniq_typename(&spelling);
        if let Some(width) = cursor.bitfield_width {
            ty.push_str(&format!(":{width}"));
        }
        Ok(ty)
    }

    /// Replace an `(anonymous …)`/`(unnamed …)` marker with the synthetic
    /// key derived from the marker's source location, so field references and
    /// the anonymous definition hash identically.
    fn uniq_typename(
        &self,
        spelling: &str,
    ) -> String {
        let Some(m) = self.anon_marker_re.find(spelling) else {
            return spelling.to_string();
        };
        let kind_word = ["union", "enum", "class"]
            .iter()
            .find(|k| spelling.contains(*k))
            .copied()
            .unwrap_or("struct");
        let marker = m.as_str();
        let span = match marker.find("at ") {
            Some(i) => marker[i + 3..].trim_end_matches(')').trim(),
            None => marker,
        };
        let key = anonymous_key(kind_word, span);
        let suffix = spelling[m.end()..].trim_end();
        format!("{key}{suffix}")
    }
}

fn loc_key(loc: &SourceLoc) -> String {
    format!("{}:{}:{}", loc.file, loc.line, loc.col)
}

/// Rebuild a member's type spelling from its raw source text: drop the
/// declarator name and glue the remaining tokens back together.
fn recover_type_spelling(
    raw: &str,
    member_name: &str,
) -> String {
    let mut s = raw.trim().trim_end_matches(';').trim().to_string();
    if let Some(rest) = s.strip_prefix("typedef") {
        s = rest.trim_start().to_string();
    }
    if !member_name.is_empty() {
        if let Some(pos) = find_ident(&s, member_name) {
            s.replace_range(pos..pos + member_name.len(), "");
        }
    }
    let mut out = String::with_capacity(s.len());
    for (i, tok) in s.split_whitespace().enumerate() {
        let glue = matches!(tok, "," | "*" | "::" | "&" | "(" | ")" | "[" | "]")
            || out.ends_with(['(', '[']);
        if i > 0 && !glue && !out.is_empty() {
            out.push(' ');
        }
        out.push_str(tok);
    }
    out
}

/// Find `name` in `s` at identifier boundaries.
fn find_ident(
    s: &str,
    name: &str,
) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(rel) = s[start..].find(name) {
        let pos = start + rel;
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + name.len();
        let after_ok = after >= s.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return Some(pos);
        }
        start = pos + 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

#[cfg(test)]
#[path = "../tests/src/normalizer_unit_tests.rs"]
mod tests;
