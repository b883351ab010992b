//! Binary-layout notation: one primitive-type code per field, with repeat
//! counts for arrays and bit widths for bit-fields.

use crate::descriptor::TypeDescriptor;
use crate::record::MemberQualifier;
use crate::render::{
    AggregateView, ClassView, FieldView, RenderError, Renderer,
};

/// Primitive-type codes.
const CODES: &[(&str, &str)] = &[
    ("void", "x"),
    ("_Bool", "?"),
    ("bool", "?"),
    ("char", "c"),
    ("unsigned char", "B"),
    ("short", "h"),
    ("short int", "h"),
    ("unsigned short", "H"),
    ("int", "i"),
    ("unsigned int", "I"),
    ("long", "l"),
    ("long int", "l"),
    ("unsigned long", "L"),
    ("float", "f"),
    ("ssize_t", "n"),
    ("size_t", "N"),
    ("double", "d"),
    ("long long", "q"),
    ("unsigned long long", "Q"),
];

fn code_for(base: &str) -> Option<&'static str> {
    CODES.iter().find(|(name, _)| *name == base).map(|(_, code)| *code)
}

/// Flatten a stored identifier into a layout-safe name.
fn sanitize(identifier: &str) -> String {
    identifier.replace("?_", "").replace(['$', ':'], "_").replace(' ', "_")
}

pub struct LayoutRenderer;

impl LayoutRenderer {
    /// Translate one field descriptor into its layout code.
    fn field_code(
        identifier: &str,
        view: &FieldView,
    ) -> Result<String, RenderError> {
        let desc: &TypeDescriptor = &view.desc;
        // Any pointer is a P, function pointers included.
        let mut code: Option<String> = if desc.indirection > 0 || desc.is_ptr_to_function {
            Some("P".to_string())
        } else {
            code_for(&desc.base).map(str::to_string)
        };
        let mut named = code.is_none().then(|| sanitize(&desc.base));

        if desc.dim > 0 {
            if code.as_deref() == Some("x") {
                return Err(RenderError::VoidArray {
                    identifier: identifier.to_string(),
                    field: view.name.clone(),
                });
            }
            // Char buffers collapse to a byte-string code.
            if matches!(code.as_deref(), Some("c" | "B")) {
                code = Some("s".to_string());
            }
            match (&mut code, &mut named) {
                (Some(c), _) => *c = format!("{c} * {}", desc.dim),
                (None, Some(n)) => *n = format!("{n} * {}", desc.dim),
                _ => {},
            }
        } else if desc.bitfield_width > 0 {
            match (&mut code, &mut named) {
                (Some(c), _) => *c = format!("{c} *#{}", desc.bitfield_width),
                (None, Some(n)) => *n = format!("{n} *#{}", desc.bitfield_width),
                _ => {},
            }
        }

        Ok(code.or(named).unwrap_or_default())
    }

    fn field_line(
        identifier: &str,
        view: &FieldView,
    ) -> Result<String, RenderError> {
        let code = Self::field_code(identifier, view)?;
        let mut line = format!("  {}: {code}", view.name);
        // Multi-line comments do not fit the one-line-per-field shape.
        if let Some(comment) = view.comment.as_deref() {
            if !comment.contains('\n') && !comment.is_empty() {
                line.push_str(" ; ");
                line.push_str(comment);
            }
        }
        Ok(line)
    }
}

impl Renderer for LayoutRenderer {
    fn name(&self) -> &'static str {
        "layout"
    }

    /// Layout output has no braces to inline into; anonymous definitions are
    /// emitted as predecessors under their sanitized names.
    fn inline_anonymous(&self) -> bool {
        false
    }

    fn forward_ref(
        &self,
        _identifier: &str,
    ) -> String {
        String::new()
    }

    fn aggregate(
        &self,
        view: &AggregateView,
    ) -> Result<String, RenderError> {
        let kind = if view.is_union { "union" } else { "struct" };
        let mut lines = vec![format!("{kind} {}:", sanitize(&view.identifier))];
        for field in &view.fields {
            lines.push(Self::field_line(&view.identifier, field)?);
        }
        Ok(lines.join("\n"))
    }

    /// Classes flatten to their data-member layout; methods and inheritance
    /// carry no bytes here.
    fn class_decl(
        &self,
        view: &ClassView,
    ) -> Result<String, RenderError> {
        let mut lines = vec![format!("struct {}:", sanitize(&view.identifier))];
        for (_, members) in &view.buckets {
            for member in members {
                if member.qualifier != MemberQualifier::None {
                    continue;
                }
                // Methods carry no bytes; function-pointer members do.
                if member.field.desc.base.contains('(') && !member.field.desc.is_ptr_to_function {
                    continue;
                }
                lines.push(Self::field_line(&view.identifier, &member.field)?);
            }
        }
        Ok(lines.join("\n"))
    }

    fn enumeration(
        &self,
        identifier: &str,
        values: &[(String, i64)],
    ) -> String {
        let mut lines = vec![format!("enum {}: i", sanitize(identifier))];
        for (k, v) in values {
            lines.push(format!("  {k} = {v}"));
        }
        lines.join("\n")
    }

    fn typedef(
        &self,
        identifier: &str,
        view: &FieldView,
    ) -> Result<String, RenderError> {
        let code = Self::field_code(identifier, view)?;
        Ok(format!("typedef {identifier} = {code}"))
    }

    /// Function prototypes carry no layout.
    fn function(
        &self,
        _identifier: &str,
        _desc: &TypeDescriptor,
    ) -> String {
        String::new()
    }

    fn macro_def(
        &self,
        identifier: &str,
        body: &str,
    ) -> String {
        let value = body.trim();
        if let Some(v) = parse_int(value) {
            format!("{identifier} = 0x{v:x}")
        } else {
            format!("{identifier} = '{value}'")
        }
    }

    fn template_decl(
        &self,
        _params: &[String],
        body: &str,
    ) -> String {
        body.to_string()
    }

    fn namespace(
        &self,
        _identifier: &str,
        body: &str,
    ) -> String {
        body.to_string()
    }
}

fn parse_int(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
