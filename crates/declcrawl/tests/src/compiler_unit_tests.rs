use super::*;

#[test]
fn parse_diagnostics_severity_and_fields() {
    let driver = ClangDriver::default();
    let stderr = "\
t.h:3:5: error: unknown type name 'xxx'
t.h:7:1: warning: something looks off
t.h:7:1: note: declared here
t.h:1:1: fatal error: 'missing.h' file not found
1 error generated.
";
    let diags = driver.parse_diagnostics(stderr);
    assert_eq!(diags.len(), 4);

    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].file, "t.h");
    assert_eq!(diags[0].line, 3);
    assert_eq!(diags[0].col, 5);
    assert_eq!(diags[0].message, "unknown type name 'xxx'");

    assert_eq!(diags[1].severity, Severity::Warning);
    assert_eq!(diags[2].severity, Severity::Note);
    assert_eq!(diags[3].severity, Severity::Fatal);
}

#[test]
fn parse_diagnostics_ignores_unrelated_lines() {
    let driver = ClangDriver::default();
    let diags = driver.parse_diagnostics("In file included from t.h:1:\n2 warnings generated.\n");
    assert!(diags.is_empty());
}

#[test]
fn severity_ordering() {
    assert!(Severity::Note < Severity::Warning);
    assert!(Severity::Warning < Severity::Error);
    assert!(Severity::Error < Severity::Fatal);
}

#[test]
fn macro_defs_track_line_markers() {
    let driver = ClangDriver::default();
    let stdout = "\
# 1 \"t.h\"
#define ANSWER 42
# 1 \"/usr/include/other.h\" 1
#define NOT_MINE 1
# 3 \"t.h\" 2
#define NAME(x) (x + 1)
";
    let macros = driver.parse_macro_defs(stdout, "t.h");
    assert_eq!(macros.len(), 2);
    assert_eq!(macros[0].name, "ANSWER");
    assert_eq!(macros[0].body, "42");
    assert_eq!(macros[1].name, "NAME");
    assert_eq!(macros[1].body, "(x) (x + 1)");
}

#[test]
fn macro_defs_skip_reserved_names() {
    let driver = ClangDriver::default();
    let stdout = "# 1 \"t.h\"\n#define __RESERVED 1\n#define OK 2\n";
    let macros = driver.parse_macro_defs(stdout, "t.h");
    assert_eq!(macros.len(), 1);
    assert_eq!(macros[0].name, "OK");
}

#[test]
fn macro_defs_empty_body() {
    let driver = ClangDriver::default();
    let macros = driver.parse_macro_defs("# 1 \"t.h\"\n#define GUARD_H\n", "t.h");
    assert_eq!(macros.len(), 1);
    assert_eq!(macros[0].name, "GUARD_H");
    assert_eq!(macros[0].body, "");
}

#[test]
fn span_slice_clamps_multibyte_columns() {
    let span = cursor::SourceSpan {
        file: "t.h".to_string(),
        start_line: 1,
        start_col: 1,
        end_line: 1,
        end_col: 3,
    };
    // End column lands inside the snowman's encoding; the slice backs off to
    // the previous character instead of panicking.
    assert_eq!(span.slice("a☃b").as_deref(), Some("a"));

    let span = cursor::SourceSpan {
        start_col: 3,
        end_col: 0,
        ..span
    };
    assert_eq!(span.slice("a☃b").as_deref(), Some("☃b"));
}

#[test]
fn cxx_extension_detection() {
    assert!(has_cxx_extension(Path::new("a.hpp")));
    assert!(has_cxx_extension(Path::new("a.cc")));
    assert!(has_cxx_extension(Path::new("a.cxx")));
    assert!(!has_cxx_extension(Path::new("a.h")));
    assert!(!has_cxx_extension(Path::new("a.c")));
    assert!(!has_cxx_extension(Path::new("noext")));
}

#[test]
fn cxx_retry_heuristic() {
    let err = Diagnostic {
        severity: Severity::Error,
        file: "t.h".to_string(),
        line: 1,
        col: 1,
        message: "unknown type name 'namespace'".to_string(),
    };
    assert!(looks_like_cxx_error(&err));

    let warn = Diagnostic {
        severity: Severity::Warning,
        message: "expected ';' after struct".to_string(),
        ..err.clone()
    };
    assert!(!looks_like_cxx_error(&warn));

    let unrelated = Diagnostic {
        message: "something else".to_string(),
        ..err
    };
    assert!(!looks_like_cxx_error(&unrelated));
}
