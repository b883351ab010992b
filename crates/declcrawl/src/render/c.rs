//! Native C/C++ declaration notation.

use crate::descriptor::{RenderOpts, TypeDescriptor};
use crate::render::{
    AggregateView, ClassView, FieldView, RenderError, Renderer,
};

pub struct CRenderer;

impl CRenderer {
    /// Render a field's declarator, substituting an inline definition body
    /// for the base name when present.
    fn declarator(
        view: &FieldView,
        indent: &str,
    ) -> String {
        let opts = RenderOpts {
            keyword: true,
            namespace: true,
        };
        match &view.inline {
            Some(body) => {
                let mut desc = view.desc.clone();
                desc.base = body
                    .trim_end_matches(['\n', ';'])
                    .replace('\n', &format!("\n{indent}"));
                desc.namespace.clear();
                desc.render(&view.name, &opts)
            },
            None => view.desc.render(&view.name, &opts),
        }
    }
}

impl Renderer for CRenderer {
    fn name(&self) -> &'static str {
        "c"
    }

    fn inline_anonymous(&self) -> bool {
        true
    }

    fn forward_ref(
        &self,
        identifier: &str,
    ) -> String {
        format!("{identifier};")
    }

    fn aggregate(
        &self,
        view: &AggregateView,
    ) -> Result<String, RenderError> {
        // Anonymous aggregates render with a bare keyword.
        let name = if view.identifier.contains("?_") {
            if view.is_union { "union" } else { "struct" }.to_string()
        } else {
            view.identifier.clone()
        };
        let mut lines = vec![format!("{name} {{")];
        for field in &view.fields {
            lines.push(format!("  {};", Self::declarator(field, "  ")));
        }
        lines.push("};".to_string());
        Ok(lines.join("\n"))
    }

    fn class_decl(
        &self,
        view: &ClassView,
    ) -> Result<String, RenderError> {
        let mut header = view.identifier.clone();
        if !view.parents.is_empty() {
            let list: Vec<String> = view
                .parents
                .iter()
                .map(|p| {
                    let mut s = String::new();
                    if p.virtual_ {
                        s.push_str("virtual ");
                    }
                    if let Some(label) = p.access.label() {
                        s.push_str(label);
                        s.push(' ');
                    }
                    s.push_str(&p.name);
                    s
                })
                .collect();
            header.push_str(" : ");
            header.push_str(&list.join(", "));
        }
        let mut lines = vec![format!("{header} {{")];

        for using in &view.usings {
            let mut s = format!("  using {}", using.path.join("::"));
            if using.is_constructor {
                s.push(';');
            } else {
                s.push_str(&format!("::{};", using.name));
            }
            lines.push(s);
        }

        for (access, members) in &view.buckets {
            if members.is_empty() {
                continue;
            }
            if let Some(label) = access.label() {
                lines.push(format!("  {label}:"));
            }
            for member in members {
                let mut line = String::from("    ");
                if let Some(qual) = member.qualifier.label() {
                    line.push_str(qual);
                    line.push(' ');
                }
                line.push_str(&Self::declarator(&member.field, "    "));
                line.push(';');
                lines.push(line);
            }
        }

        lines.push("};".to_string());
        Ok(lines.join("\n"))
    }

    fn enumeration(
        &self,
        identifier: &str,
        values: &[(String, i64)],
    ) -> String {
        // Anonymous enums drop the synthetic name.
        let name = match identifier.find("?_") {
            Some(i) => identifier[..i].trim_end(),
            None => identifier,
        };
        let body: Vec<String> =
            values.iter().map(|(k, v)| format!("  {k} = {v}")).collect();
        format!("{name} {{\n{}\n}};", body.join(",\n"))
    }

    fn typedef(
        &self,
        identifier: &str,
        view: &FieldView,
    ) -> Result<String, RenderError> {
        let mut named = view.clone();
        named.name = identifier.to_string();
        Ok(format!("typedef {};", Self::declarator(&named, "")))
    }

    fn function(
        &self,
        identifier: &str,
        desc: &TypeDescriptor,
    ) -> String {
        format!("{};", desc.render(identifier, &RenderOpts::default()))
    }

    fn macro_def(
        &self,
        identifier: &str,
        body: &str,
    ) -> String {
        if body.is_empty() {
            format!("#define {identifier}")
        } else {
            format!("#define {identifier} {body}")
        }
    }

    fn template_decl(
        &self,
        params: &[String],
        body: &str,
    ) -> String {
        format!("template<{}>\n{body}", params.join(", "))
    }

    fn namespace(
        &self,
        identifier: &str,
        body: &str,
    ) -> String {
        let indented = body.replace('\n', "\n  ");
        format!("namespace {identifier} {{\n  {indented}\n}};")
    }
}
