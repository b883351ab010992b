use super::*;

#[test]
fn parse_primitive() {
    let d = TypeDescriptor::parse("int").unwrap();
    assert_eq!(d.base, "int");
    assert_eq!(d.indirection, 0);
    assert_eq!(d.dim, 0);
    assert!(d.is_primitive());
}

#[test]
fn parse_multi_word_primitive() {
    let d = TypeDescriptor::parse("unsigned long long").unwrap();
    assert_eq!(d.base, "unsigned long long");
    assert!(d.is_primitive());
}

#[test]
fn parse_struct_pointer() {
    let d = TypeDescriptor::parse("struct foo **").unwrap();
    assert_eq!(d.base, "struct foo");
    assert_eq!(d.indirection, 2);
    assert!(!d.is_union);
    assert!(!d.is_primitive());
}

#[test]
fn parse_union_keyword() {
    let d = TypeDescriptor::parse("union bar").unwrap();
    assert_eq!(d.base, "union bar");
    assert!(d.is_union);
}

#[test]
fn parse_drops_qualifiers() {
    let d = TypeDescriptor::parse("const char *").unwrap();
    assert_eq!(d.base, "char");
    assert_eq!(d.indirection, 1);

    let d = TypeDescriptor::parse("volatile unsigned int").unwrap();
    assert_eq!(d.base, "unsigned int");
}

#[test]
fn parse_array_dimension() {
    let d = TypeDescriptor::parse("char [16]").unwrap();
    assert_eq!(d.base, "char");
    assert_eq!(d.dim, 16);
}

#[test]
fn parse_multi_dimensional_array_folds() {
    let d = TypeDescriptor::parse("int [2][3]").unwrap();
    assert_eq!(d.base, "int");
    assert_eq!(d.dim, 6);
}

#[test]
fn parse_bitfield_width() {
    let d = TypeDescriptor::parse("unsigned int:3").unwrap();
    assert_eq!(d.base, "unsigned int");
    assert_eq!(d.bitfield_width, 3);
}

#[test]
fn bitfield_suffix_is_not_a_scope_separator() {
    let d = TypeDescriptor::parse("ns::Thing").unwrap();
    assert_eq!(d.base, "Thing");
    assert_eq!(d.namespace, "ns");
    assert_eq!(d.bitfield_width, 0);
}

#[test]
fn parse_namespace_path() {
    let d = TypeDescriptor::parse("a::b::Widget *").unwrap();
    assert_eq!(d.base, "Widget");
    assert_eq!(d.namespace, "a::b");
    assert_eq!(d.indirection, 1);
}

#[test]
fn parse_glues_template_arguments() {
    let d = TypeDescriptor::parse("std::vector<int>").unwrap();
    assert_eq!(d.base, "vector<int>");
    assert_eq!(d.namespace, "std");
}

#[test]
fn parse_drops_trailing_declarator_name() {
    let d = TypeDescriptor::parse("struct foo *bar").unwrap();
    assert_eq!(d.base, "struct foo");
    assert_eq!(d.indirection, 1);
}

#[test]
fn parse_unterminated_bracket_is_an_error() {
    assert!(TypeDescriptor::parse("int [3").is_err());
    assert!(TypeDescriptor::parse("void (int").is_err());
}

#[test]
fn parse_function_pointer() {
    let d = TypeDescriptor::parse("void (*)(int, char)").unwrap();
    assert_eq!(d.base, "void (*)(int, char)");
    assert!(d.is_ptr_to_function);
}

#[test]
fn function_pointer_declarator_name_is_erased() {
    let d = TypeDescriptor::parse("void (*cb)(int)").unwrap();
    assert_eq!(d.base, "void (*)(int)");
    assert!(d.is_ptr_to_function);
}

#[test]
fn render_function_pointer_with_member_name() {
    let d = TypeDescriptor::parse("void (*)(int)").unwrap();
    assert_eq!(d.render("cb", &RenderOpts::default()), "void (*cb)(int)");
}

#[test]
fn render_plain_prototype_with_member_name() {
    let d = TypeDescriptor::parse("int (int, char)").unwrap();
    assert_eq!(d.render("f", &RenderOpts::default()), "int f(int, char)");
}

#[test]
fn render_struct_pointer_declarator() {
    let d = TypeDescriptor::parse("struct foo *").unwrap();
    assert_eq!(d.render("next", &RenderOpts::default()), "struct foo *next");
}

#[test]
fn render_array_and_bitfield_suffixes() {
    let d = TypeDescriptor::parse("char [8]").unwrap();
    assert_eq!(d.render("name", &RenderOpts::default()), "char name[8]");

    let d = TypeDescriptor::parse("unsigned int:5").unwrap();
    assert_eq!(d.render("flags", &RenderOpts::default()), "unsigned int flags:5");
}

#[test]
fn render_without_keyword_or_namespace() {
    let d = TypeDescriptor::parse("struct ns::foo").unwrap();
    let opts = RenderOpts {
        keyword: false,
        namespace: false,
    };
    assert_eq!(d.render("x", &opts), "foo x");
}

#[test]
fn parse_render_round_trip() {
    for spelling in [
        "int",
        "struct foo *",
        "unsigned long long",
        "char [16]",
        "union bar **",
        "unsigned int:3",
        "a::b::Widget *",
        "void (*)(int, char)",
    ] {
        let d = TypeDescriptor::parse(spelling).unwrap();
        let rendered = d.render("m", &RenderOpts::default());
        let reparsed = TypeDescriptor::parse(&rendered).unwrap();
        assert_eq!(reparsed, d, "round trip through '{rendered}'");
    }
}

#[test]
fn bare_base_strips_keyword() {
    let d = TypeDescriptor::parse("struct foo").unwrap();
    assert_eq!(d.bare_base(), "foo");

    let d = TypeDescriptor::parse("int").unwrap();
    assert_eq!(d.bare_base(), "int");
}

#[test]
fn anonymous_key_is_deterministic() {
    let span = "fixtures/anon.h:3:5";
    let a = anonymous_key("struct", span);
    let b = anonymous_key("struct", span);
    assert_eq!(a, b);
    assert!(a.starts_with("struct ?_"));
    let digest = a.strip_prefix("struct ?_").unwrap();
    assert_eq!(digest.len(), 8);
    assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn anonymous_keys_differ_per_span() {
    let a = anonymous_key("union", "f.h:1:1");
    let b = anonymous_key("union", "f.h:2:1");
    assert_ne!(a, b);
}

#[test]
fn anonymous_base_detection() {
    let d = TypeDescriptor::parse(&anonymous_key("struct", "f.h:4:3")).unwrap();
    assert!(d.is_anonymous());

    let d = TypeDescriptor::parse("struct foo").unwrap();
    assert!(!d.is_anonymous());
}
