//! Recursive declaration synthesis.
//!
//! Given a root record and a read-only record store, resolve every referenced
//! type, break cycles with forward references, inline anonymous definitions
//! and emit output through a [`Renderer`]. The visited set is explicit state
//! local to one synthesis call; independent calls against the same store do
//! not share cycle-breaking state.

use std::collections::HashSet;

use tracing::warn;

use crate::descriptor::{TypeDescriptor, PRIMITIVES};
use crate::record::{Access, ClassMember, Field, Record, RecordPayload};
use crate::render::{
    AggregateView, ClassView, FieldView, MemberView, ParentView, RenderError, Renderer, UsingView,
};
use crate::store::{Query, RecordStore};

/// A non-fatal problem encountered during synthesis.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthDiagnostic {
    /// A referenced identifier is absent from the store; the raw base name
    /// was used verbatim.
    MissingIdentifier(String),
    /// A field's type spelling could not be parsed; the field was skipped.
    MalformedType {
        field: String,
        spelling: String,
    },
}

impl std::fmt::Display for SynthDiagnostic {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::MissingIdentifier(id) => write!(f, "identifier {id} not found"),
            Self::MalformedType {
                field,
                spelling,
            } => {
                write!(f, "field '{field}': malformed type spelling '{spelling}'")
            },
        }
    }
}

/// The result of one synthesis call: complete output text plus any
/// diagnostics raised along the way.
#[derive(Debug)]
pub struct Synthesis {
    pub text: String,
    pub diagnostics: Vec<SynthDiagnostic>,
}

/// Definitions that must textually precede a declaration, in emission order,
/// plus the declaration body itself.
struct Rendered {
    predecessors: Vec<String>,
    body: String,
}

impl Rendered {
    fn leaf(body: String) -> Self {
        Self {
            predecessors: Vec::new(),
            body,
        }
    }
}

/// Drives recursive resolution against a store and a renderer.
pub struct Synthesizer<'a> {
    store: &'a dyn RecordStore,
    renderer: &'a dyn Renderer,
    tag: Option<String>,
    recursive: bool,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self {
            store,
            renderer,
            tag: None,
            recursive: true,
        }
    }

    /// Scope all store queries to one crawl tag.
    pub fn with_tag(
        mut self,
        tag: impl Into<String>,
    ) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Render the root record alone, resolving nothing from the store.
    pub fn flat(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Produce complete output text for one record, including every
    /// transitively referenced definition. Missing identifiers degrade the
    /// output and surface as diagnostics; they are never fatal.
    pub fn show(
        &self,
        record: &Record,
    ) -> Result<Synthesis, RenderError> {
        let mut visited: HashSet<String> =
            PRIMITIVES.iter().map(|p| p.to_string()).collect();
        let mut open = HashSet::new();
        let mut diagnostics = Vec::new();
        let rendered = self.synthesize(record, &mut visited, &mut open, &mut diagnostics)?;
        for diag in &diagnostics {
            warn!("{diag}");
        }
        let text = if rendered.predecessors.is_empty() {
            rendered.body
        } else {
            format!("{}\n\n{}", rendered.predecessors.join("\n\n"), rendered.body)
        };
        Ok(Synthesis {
            text,
            diagnostics,
        })
    }

    fn synthesize(
        &self,
        record: &Record,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        match &record.payload {
            RecordPayload::Struct {
                fields,
            } => self.synth_aggregate(record, fields, false, visited, open, diags),
            RecordPayload::Union {
                fields,
            } => self.synth_aggregate(record, fields, true, visited, open, diags),
            RecordPayload::Class {
                members,
            } => self.synth_class(record, members, visited, open, diags),
            RecordPayload::Typedef {
                underlying,
            } => self.synth_typedef(record, underlying, visited, open, diags),
            RecordPayload::Enum {
                values,
            } => {
                visited.insert(record.id.clone());
                let mut sorted: Vec<(String, i64)> =
                    values.iter().map(|(k, v)| (k.clone(), *v)).collect();
                sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                Ok(Rendered::leaf(self.renderer.enumeration(&record.id, &sorted)))
            },
            RecordPayload::Function {
                prototype,
            } => {
                let desc = match TypeDescriptor::parse(prototype) {
                    Ok(desc) => desc,
                    Err(_) => {
                        diags.push(SynthDiagnostic::MalformedType {
                            field: record.id.clone(),
                            spelling: prototype.clone(),
                        });
                        bare_descriptor(prototype)
                    },
                };
                Ok(Rendered::leaf(self.renderer.function(&record.id, &desc)))
            },
            RecordPayload::Macro {
                body,
            } => Ok(Rendered::leaf(self.renderer.macro_def(&record.id, body))),
            RecordPayload::Template {
                params,
                body,
            } => self.synth_template(params, body, visited, open, diags),
            RecordPayload::Namespace {
                local,
            } => self.synth_namespace(record, local, visited, open, diags),
        }
    }

    /// Steps 1-6 of aggregate synthesis: cycle break, pre-order visit
    /// marking, per-field resolution with predecessor hoisting, anonymous
    /// inlining.
    fn synth_aggregate(
        &self,
        record: &Record,
        fields: &[Field],
        is_union: bool,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        if visited.contains(&record.id) {
            return Ok(Rendered::leaf(self.renderer.forward_ref(&record.id)));
        }
        visited.insert(record.id.clone());
        open.insert(record.id.clone());

        let mut predecessors: Vec<String> = Vec::new();
        let mut views: Vec<FieldView> = Vec::new();

        for field in fields {
            let desc = match TypeDescriptor::parse(&field.ty) {
                Ok(desc) => desc,
                Err(_) => {
                    diags.push(SynthDiagnostic::MalformedType {
                        field: field.name.clone(),
                        spelling: field.ty.clone(),
                    });
                    continue;
                },
            };
            // Unnamed entries are only kept for anonymous union members.
            if field.name.is_empty() && !desc.base.starts_with("union") {
                continue;
            }

            let mut inline = None;
            // Function spellings never name a stored definition.
            let resolvable =
                self.recursive && !desc.is_primitive() && !desc.base.contains('(');
            if resolvable {
                if open.contains(&desc.base) {
                    // The definition is still being emitted along this path;
                    // only a forward declaration breaks the cycle. Plain
                    // typedef names cannot be forward-declared.
                    if desc.bare_base() != desc.base {
                        push_unique(&mut predecessors, self.renderer.forward_ref(&desc.base));
                    }
                } else if !visited.contains(&desc.base) {
                    inline = self.resolve_base(
                        &desc,
                        Some(&record.id),
                        None,
                        &mut predecessors,
                        visited,
                        open,
                        diags,
                    )?;
                }
            }

            views.push(FieldView {
                desc,
                name: field.name.clone(),
                comment: field.comment.clone(),
                inline,
                keyword: true,
            });
        }

        let body = self.renderer.aggregate(&AggregateView {
            identifier: record.id.clone(),
            is_union,
            fields: views,
        })?;
        open.remove(&record.id);
        Ok(Rendered {
            predecessors,
            body,
        })
    }

    fn synth_class(
        &self,
        record: &Record,
        members: &[ClassMember],
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        if visited.contains(&record.id) {
            return Ok(Rendered::leaf(self.renderer.forward_ref(&record.id)));
        }
        visited.insert(record.id.clone());
        open.insert(record.id.clone());

        let class_name = record
            .id
            .rsplit("::")
            .next()
            .unwrap_or(&record.id)
            .trim_start_matches("class ")
            .trim_start_matches("struct ")
            .trim_start_matches("union ")
            .to_string();

        let mut predecessors: Vec<String> = Vec::new();
        let mut parents: Vec<ParentView> = Vec::new();
        let mut usings: Vec<UsingView> = Vec::new();
        let mut buckets: Vec<(Access, Vec<MemberView>)> = vec![
            (Access::Public, Vec::new()),
            (Access::Protected, Vec::new()),
            (Access::Private, Vec::new()),
            (Access::Unspecified, Vec::new()),
        ];

        for member in members {
            match member {
                ClassMember::Parent {
                    name,
                    virtual_,
                    access,
                } => {
                    if self.recursive {
                        self.resolve_parent(name, &mut predecessors, visited, open, diags)?;
                    }
                    parents.push(ParentView {
                        name: name.clone(),
                        virtual_: *virtual_,
                        access: *access,
                    });
                },
                ClassMember::Using {
                    path,
                    name,
                } => {
                    usings.push(UsingView {
                        path: path.clone(),
                        name: name.clone(),
                        is_constructor: *name == class_name,
                    });
                },
                ClassMember::Data {
                    qualifier,
                    ty,
                    name,
                    access,
                    comment,
                    ..
                } => {
                    let desc = match TypeDescriptor::parse(ty) {
                        Ok(desc) => desc,
                        Err(_) => {
                            diags.push(SynthDiagnostic::MalformedType {
                                field: name.clone(),
                                spelling: ty.clone(),
                            });
                            continue;
                        },
                    };

                    // Nested types are scoped to the enclosing class and
                    // inlined even when named.
                    let nested = desc
                        .namespace
                        .rsplit("::")
                        .next()
                        .is_some_and(|ns| !ns.is_empty() && ns.starts_with(&class_name))
                        || desc.base.starts_with("enum ?_")
                        || desc.is_anonymous();

                    let mut inline = None;
                    let resolvable =
                        self.recursive && !desc.is_primitive() && !desc.base.contains('(');
                    if resolvable && !nested && open.contains(&desc.base) {
                        if desc.bare_base() != desc.base {
                            push_unique(&mut predecessors, self.renderer.forward_ref(&desc.base));
                        }
                    } else if resolvable && (nested || !visited.contains(&desc.base)) {
                        inline = self.resolve_base(
                            &desc,
                            nested.then_some(record.id.as_str()),
                            nested.then_some(&class_name),
                            &mut predecessors,
                            visited,
                            open,
                            diags,
                        )?;
                    }

                    let view = MemberView {
                        qualifier: *qualifier,
                        field: FieldView {
                            desc,
                            name: name.clone(),
                            comment: comment.clone(),
                            inline,
                            keyword: true,
                        },
                    };
                    let slot = match access {
                        Access::Public => 0,
                        Access::Protected => 1,
                        Access::Private => 2,
                        Access::Unspecified => 3,
                    };
                    buckets[slot].1.push(view);
                },
            }
        }

        let body = self.renderer.class_decl(&ClassView {
            identifier: record.id.clone(),
            class_name,
            parents,
            usings,
            buckets,
        })?;
        open.remove(&record.id);
        Ok(Rendered {
            predecessors,
            body,
        })
    }

    fn synth_typedef(
        &self,
        record: &Record,
        underlying: &str,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        visited.insert(record.id.clone());
        let desc = match TypeDescriptor::parse(underlying) {
            Ok(desc) => desc,
            Err(_) => {
                diags.push(SynthDiagnostic::MalformedType {
                    field: record.id.clone(),
                    spelling: underlying.to_string(),
                });
                bare_descriptor(underlying)
            },
        };

        let mut predecessors = Vec::new();
        let mut inline = None;
        if self.recursive && !desc.is_primitive() && !visited.contains(&desc.base) {
            // Anonymous underlying types are top-level records; scope the
            // lookup by source file rather than enclosing identifier.
            let mut query = self.query_for(&desc.base);
            if desc.is_anonymous() {
                query = query.with_source_file(record.source_file.clone());
            }
            match self.get_scoped(query, &desc.base) {
                Some(sub) => {
                    let rendered = self.synthesize(&sub, visited, open, diags)?;
                    if desc.is_anonymous() && self.renderer.inline_anonymous() {
                        extend_unique(&mut predecessors, rendered.predecessors);
                        inline = Some(rendered.body);
                    } else {
                        extend_unique(&mut predecessors, rendered.predecessors);
                        push_unique(&mut predecessors, rendered.body);
                        visited.insert(desc.base.clone());
                    }
                },
                None => note_missing(diags, &desc.base),
            }
        }

        let body = self.renderer.typedef(
            &record.id,
            &FieldView {
                desc,
                name: record.id.clone(),
                comment: None,
                inline,
                keyword: true,
            },
        )?;
        Ok(Rendered {
            predecessors,
            body,
        })
    }

    fn synth_template(
        &self,
        params: &[String],
        body: &Record,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        // Template parameters never resolve against the store.
        for param in params {
            let name = param.strip_prefix("typename ").unwrap_or(param);
            visited.insert(name.to_string());
        }
        let rendered = self.synthesize(body, visited, open, diags)?;
        let text = self.renderer.template_decl(params, &rendered.body);
        Ok(Rendered {
            predecessors: rendered.predecessors,
            body: text,
        })
    }

    fn synth_namespace(
        &self,
        record: &Record,
        local: &[String],
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Rendered, RenderError> {
        let mut predecessors = Vec::new();
        let mut bodies = Vec::new();
        for id in local {
            let query = self.query_for(id).with_src(record.id.clone());
            match self.get_scoped(query, id) {
                Some(sub) => {
                    let rendered = self.synthesize(&sub, visited, open, diags)?;
                    extend_unique(&mut predecessors, rendered.predecessors);
                    bodies.push(rendered.body);
                },
                None => note_missing(diags, id),
            }
        }
        let body = self.renderer.namespace(&record.id, &bodies.join("\n\n"));
        Ok(Rendered {
            predecessors,
            body,
        })
    }

    /// Resolve one field's base type against the store. Returns the inline
    /// body when the definition substitutes into the field, otherwise pushes
    /// it onto the predecessor list.
    fn resolve_base(
        &self,
        desc: &TypeDescriptor,
        scope: Option<&str>,
        strip_class: Option<&str>,
        predecessors: &mut Vec<String>,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<Option<String>, RenderError> {
        let mut query = self.query_for(&desc.base);
        let scoped = desc.is_anonymous() || strip_class.is_some();
        if scoped {
            if let Some(enclosing) = scope {
                query = query.with_src(enclosing.to_string());
            }
        }

        let Some(sub) = self.get_scoped(query, &desc.base) else {
            note_missing(diags, &desc.base);
            return Ok(None);
        };

        let rendered = self.synthesize(&sub, visited, open, diags)?;
        if scoped && self.renderer.inline_anonymous() {
            // Inline the definition; hoist its own predecessors upward.
            extend_unique(predecessors, rendered.predecessors);
            let mut body = rendered.body;
            if let Some(class_name) = strip_class {
                body = body.replace(&format!("{class_name}::"), "");
            }
            Ok(Some(body))
        } else {
            extend_unique(predecessors, rendered.predecessors);
            push_unique(predecessors, rendered.body);
            visited.insert(desc.base.clone());
            Ok(None)
        }
    }

    fn resolve_parent(
        &self,
        name: &str,
        predecessors: &mut Vec<String>,
        visited: &mut HashSet<String>,
        open: &mut HashSet<String>,
        diags: &mut Vec<SynthDiagnostic>,
    ) -> Result<(), RenderError> {
        let base = name.to_string();
        if visited.contains(&base) {
            return Ok(());
        }
        let Some(sub) = self.get_scoped(self.query_for(&base), &base) else {
            note_missing(diags, &base);
            return Ok(());
        };
        let rendered = self.synthesize(&sub, visited, open, diags)?;
        extend_unique(predecessors, rendered.predecessors);
        push_unique(predecessors, rendered.body);
        visited.insert(base);
        Ok(())
    }

    fn query_for(
        &self,
        identifier: &str,
    ) -> Query {
        let mut query = Query::id(identifier);
        if let Some(tag) = &self.tag {
            query = query.with_tag(tag.clone());
        }
        query
    }

    /// Fetch a record by identifier, retrying with kind prefixes for plain
    /// C++ type names (base-class spellings carry no `class` keyword).
    fn get_scoped(
        &self,
        query: Query,
        identifier: &str,
    ) -> Option<Record> {
        if let Some(record) = self.store.get(&query) {
            return Some(record);
        }
        if identifier.contains(' ') {
            return None;
        }
        for prefix in ["class", "struct", "union"] {
            let mut retry = query.clone();
            retry.id = Some(format!("{prefix} {identifier}"));
            if let Some(record) = self.store.get(&retry) {
                return Some(record);
            }
        }
        None
    }
}

/// Placeholder for a spelling that failed to parse; the raw text is kept as
/// the base so degraded output still names the type.
fn bare_descriptor(spelling: &str) -> TypeDescriptor {
    TypeDescriptor {
        base: spelling.trim().to_string(),
        namespace: String::new(),
        indirection: 0,
        dim: 0,
        bitfield_width: 0,
        is_union: false,
        is_ptr_to_function: false,
    }
}

fn push_unique(
    predecessors: &mut Vec<String>,
    text: String,
) {
    if !text.is_empty() && !predecessors.contains(&text) {
        predecessors.push(text);
    }
}

fn extend_unique(
    predecessors: &mut Vec<String>,
    items: Vec<String>,
) {
    for item in items {
        push_unique(predecessors, item);
    }
}

fn note_missing(
    diags: &mut Vec<SynthDiagnostic>,
    identifier: &str,
) {
    let diag = SynthDiagnostic::MissingIdentifier(identifier.to_string());
    if !diags.contains(&diag) {
        diags.push(diag);
    }
}
