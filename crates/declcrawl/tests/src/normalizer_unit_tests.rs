use super::*;

use crate::provider::cursor::{Severity, SourceSpan};
use crate::provider::MacroDef;

fn output_of(cursors: Vec<Cursor>) -> CrawlOutput {
    CrawlOutput {
        main_file: "t.h".to_string(),
        source: String::new(),
        cursors,
        diagnostics: Vec::new(),
        macros: Vec::new(),
        cxx: false,
    }
}

fn field_cursor(
    name: &str,
    ty: &str,
) -> Cursor {
    let mut c = Cursor::new(CursorKind::FieldDecl, name);
    c.type_spelling = ty.to_string();
    c
}

#[test]
fn struct_fields_in_declaration_order() {
    let mut s = Cursor::new(CursorKind::StructDecl, "point");
    s.children.push(field_cursor("x", "int"));
    s.children.push(field_cursor("y", "int"));

    let records = normalize(&output_of(vec![s]), &CrawlOptions::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "struct point");
    match &records[0].payload {
        RecordPayload::Struct {
            fields,
        } => {
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0], Field::new("int", "x"));
            assert_eq!(fields[1], Field::new("int", "y"));
        },
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn records_are_stamped_with_tag_and_file() {
    let s = Cursor::new(CursorKind::StructDecl, "point");
    let opts = CrawlOptions {
        strict: false,
        tag: Some("v1".to_string()),
    };
    let records = normalize(&output_of(vec![s]), &opts).unwrap();
    assert_eq!(records[0].tag.as_deref(), Some("v1"));
    assert_eq!(records[0].source_file, "t.h");
}

#[test]
fn bitfield_width_appended_to_member_type() {
    let mut s = Cursor::new(CursorKind::StructDecl, "flags");
    let mut f = field_cursor("a", "unsigned int");
    f.bitfield_width = Some(3);
    s.children.push(f);

    let records = normalize(&output_of(vec![s]), &CrawlOptions::default()).unwrap();
    match &records[0].payload {
        RecordPayload::Struct {
            fields,
        } => assert_eq!(fields[0].ty, "unsigned int:3"),
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn anonymous_nested_struct_links_to_member_reference() {
    // struct outer { struct { int v; } inner; };
    let mut anon = Cursor::new(CursorKind::StructDecl, "");
    anon.loc = SourceLoc {
        file: "t.h".to_string(),
        line: 2,
        col: 3,
    };
    anon.children.push(field_cursor("v", "int"));

    let member = field_cursor("inner", "struct (anonymous at t.h:2:3)");

    let mut outer = Cursor::new(CursorKind::StructDecl, "outer");
    outer.children.push(anon);
    outer.children.push(member);

    let records = normalize(&output_of(vec![outer]), &CrawlOptions::default()).unwrap();
    assert_eq!(records.len(), 2);

    let expected = anonymous_key("struct", "t.h:2:3");
    assert_eq!(records[0].id, expected);
    assert_eq!(records[0].src.as_deref(), Some("struct outer"));

    match &records[1].payload {
        RecordPayload::Struct {
            fields,
        } => {
            // The phantom entry for the nested definition is replaced by the
            // named member referencing it.
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].name, "inner");
            assert_eq!(fields[0].ty, expected);
        },
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn named_nested_struct_keeps_phantom_field() {
    // struct outer { struct inner { int v; }; };  (no member of that type)
    let mut inner = Cursor::new(CursorKind::StructDecl, "inner");
    inner.children.push(field_cursor("v", "int"));
    let mut outer = Cursor::new(CursorKind::StructDecl, "outer");
    outer.children.push(inner);

    let records = normalize(&output_of(vec![outer]), &CrawlOptions::default()).unwrap();
    assert_eq!(records.len(), 2);
    match &records[1].payload {
        RecordPayload::Struct {
            fields,
        } => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].ty, "struct inner");
            assert_eq!(fields[0].name, "");
        },
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn enum_values_with_sequential_fallback() {
    let mut e = Cursor::new(CursorKind::EnumDecl, "state");
    let mut a = Cursor::new(CursorKind::EnumConstantDecl, "A");
    a.enum_value = Some(5);
    let b = Cursor::new(CursorKind::EnumConstantDecl, "B");
    let mut c = Cursor::new(CursorKind::EnumConstantDecl, "C");
    c.enum_value = Some(1);
    e.children.extend([a, b, c]);

    let records = normalize(&output_of(vec![e]), &CrawlOptions::default()).unwrap();
    assert_eq!(records[0].id, "enum state");
    match &records[0].payload {
        RecordPayload::Enum {
            values,
        } => {
            assert_eq!(values["A"], 5);
            assert_eq!(values["B"], 6);
            assert_eq!(values["C"], 1);
        },
        other => panic!("expected enum payload, got {other:?}"),
    }
}

#[test]
fn typedef_record() {
    let mut t = Cursor::new(CursorKind::TypedefDecl, "length_t");
    t.type_spelling = "unsigned long".to_string();

    let records = normalize(&output_of(vec![t]), &CrawlOptions::default()).unwrap();
    assert_eq!(records[0].id, "length_t");
    assert_eq!(
        records[0].payload,
        RecordPayload::Typedef {
            underlying: "unsigned long".to_string(),
        }
    );
}

#[test]
fn function_prototype_strips_attributes() {
    let mut f = Cursor::new(CursorKind::FunctionDecl, "emit");
    f.type_spelling = "void (int) __attribute__((noreturn))".to_string();

    let records = normalize(&output_of(vec![f]), &CrawlOptions::default()).unwrap();
    assert_eq!(
        records[0].payload,
        RecordPayload::Function {
            prototype: "void (int)".to_string(),
        }
    );
}

#[test]
fn cxx_struct_becomes_class_record() {
    let mut base = Cursor::new(CursorKind::BaseSpecifier, "Base");
    base.access = Access::Public;

    let mut field = field_cursor("x", "int");
    field.access = Access::Private;

    let mut method = Cursor::new(CursorKind::Method, "get");
    method.type_spelling = "int ()".to_string();
    method.access = Access::Public;
    method.is_virtual = true;

    let mut s = Cursor::new(CursorKind::StructDecl, "widget");
    s.children.extend([base, field, method]);

    let mut output = output_of(vec![s]);
    output.cxx = true;

    let records = normalize(&output, &CrawlOptions::default()).unwrap();
    match &records[0].payload {
        RecordPayload::Class {
            members,
        } => {
            assert_eq!(members.len(), 3);
            assert_eq!(
                members[0],
                ClassMember::Parent {
                    name: "Base".to_string(),
                    virtual_: false,
                    access: Access::Public,
                }
            );
            match &members[1] {
                ClassMember::Data {
                    qualifier,
                    access,
                    ..
                } => {
                    assert_eq!(*qualifier, MemberQualifier::None);
                    assert_eq!(*access, Access::Private);
                },
                other => panic!("expected data member, got {other:?}"),
            }
            match &members[2] {
                ClassMember::Data {
                    qualifier,
                    ..
                } => assert_eq!(*qualifier, MemberQualifier::Virtual),
                other => panic!("expected data member, got {other:?}"),
            }
        },
        other => panic!("expected class payload, got {other:?}"),
    }
}

#[test]
fn namespace_record_scopes_its_children() {
    let mut item = Cursor::new(CursorKind::StructDecl, "item");
    item.children.push(field_cursor("n", "int"));
    let mut ns = Cursor::new(CursorKind::Namespace, "inv");
    ns.children.push(item);

    let records = normalize(&output_of(vec![ns]), &CrawlOptions::default()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "struct item");
    assert_eq!(records[0].src.as_deref(), Some("inv"));
    assert_eq!(
        records[1].payload,
        RecordPayload::Namespace {
            local: vec!["struct item".to_string()],
        }
    );
}

#[test]
fn class_template_wraps_body_record() {
    let mut body = Cursor::new(CursorKind::StructDecl, "box");
    body.children.push(field_cursor("value", "T"));
    let param = Cursor::new(CursorKind::TemplateTypeParam, "T");
    let mut tpl = Cursor::new(CursorKind::ClassTemplate, "box");
    tpl.children.extend([param, body]);

    let records = normalize(&output_of(vec![tpl]), &CrawlOptions::default()).unwrap();
    let template = records.iter().find(|r| r.id == "struct box").unwrap();
    match &template.payload {
        RecordPayload::Template {
            params,
            body,
        } => {
            assert_eq!(params, &["T".to_string()]);
            assert_eq!(body.id, "struct box");
        },
        other => panic!("expected template payload, got {other:?}"),
    }
}

#[test]
fn later_definition_replaces_earlier() {
    let first = Cursor::new(CursorKind::StructDecl, "thing");
    let mut second = Cursor::new(CursorKind::StructDecl, "thing");
    second.children.push(field_cursor("n", "int"));

    let records = normalize(&output_of(vec![first, second]), &CrawlOptions::default()).unwrap();
    assert_eq!(records.len(), 1);
    match &records[0].payload {
        RecordPayload::Struct {
            fields,
        } => assert_eq!(fields.len(), 1),
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn macros_become_records() {
    let mut output = output_of(Vec::new());
    output.macros.push(MacroDef {
        name: "ANSWER".to_string(),
        body: "42".to_string(),
    });

    let records = normalize(&output, &CrawlOptions::default()).unwrap();
    assert_eq!(records[0].id, "ANSWER");
    assert_eq!(
        records[0].payload,
        RecordPayload::Macro {
            body: "42".to_string(),
        }
    );
}

fn unresolved_output() -> CrawlOutput {
    let source = "struct A {\n  int x;\n  matrix obj;\n};\n";
    let mut member = field_cursor("obj", "int");
    member.loc = SourceLoc {
        file: "t.h".to_string(),
        line: 3,
        col: 3,
    };
    member.extent = SourceSpan {
        file: "t.h".to_string(),
        start_line: 3,
        start_col: 3,
        end_line: 3,
        end_col: 12,
    };
    let mut s = Cursor::new(CursorKind::StructDecl, "A");
    s.children.push(member);

    let mut output = output_of(vec![s]);
    output.source = source.to_string();
    output.diagnostics.push(Diagnostic {
        severity: Severity::Error,
        file: "t.h".to_string(),
        line: 3,
        col: 3,
        message: "unknown type name 'matrix'".to_string(),
    });
    output
}

#[test]
fn unresolved_type_recovered_from_source_tokens() {
    let records = normalize(&unresolved_output(), &CrawlOptions::default()).unwrap();
    match &records[0].payload {
        RecordPayload::Struct {
            fields,
        } => {
            assert_eq!(fields[0].name, "obj");
            assert_eq!(fields[0].ty, "matrix");
        },
        other => panic!("expected struct payload, got {other:?}"),
    }
}

#[test]
fn unresolved_type_is_fatal_in_strict_mode() {
    let opts = CrawlOptions {
        strict: true,
        tag: None,
    };
    let err = normalize(&unresolved_output(), &opts).unwrap_err();
    match err {
        NormalizeError::UnresolvedType {
            line,
            member,
            ..
        } => {
            assert_eq!(line, 3);
            assert_eq!(member, "obj");
        },
    }
}

#[test]
fn recover_type_spelling_glues_tokens() {
    assert_eq!(recover_type_spelling("matrix obj;", "obj"), "matrix");
    assert_eq!(recover_type_spelling("p_matrix * pm;", "pm"), "p_matrix*");
    assert_eq!(recover_type_spelling("typedef vec v_t;", "v_t"), "vec");
    // Only identifier-boundary occurrences of the member name are removed.
    assert_eq!(recover_type_spelling("xy xyz;", "xy"), "xyz");
}
