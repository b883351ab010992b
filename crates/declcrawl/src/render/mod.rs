//! Output notations.
//!
//! The synthesizer resolves references and decides emission order; a
//! [`Renderer`] only shapes the text of each emitted unit. Adding a notation
//! means implementing the trait, not touching the synthesizer.

pub mod c;
pub mod layout;

pub use c::CRenderer;
pub use layout::LayoutRenderer;

use crate::descriptor::TypeDescriptor;
use crate::record::{Access, MemberQualifier};

#[derive(Debug)]
pub enum RenderError {
    /// A primitive the notation cannot express, e.g. a `void` array.
    VoidArray {
        identifier: String,
        field: String,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::VoidArray {
                identifier,
                field,
            } => {
                write!(f, "{identifier}: field '{field}' is a void array")
            },
        }
    }
}

impl std::error::Error for RenderError {}

/// Renderer selection failed before any synthesis began.
#[derive(Debug)]
pub struct UnknownFormat(pub String);

impl std::fmt::Display for UnknownFormat {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "unknown output format '{}'", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

/// One resolved field, ready for rendering.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub desc: TypeDescriptor,
    pub name: String,
    pub comment: Option<String>,
    /// Rendered body of an anonymous or nested definition that replaces the
    /// base name in place.
    pub inline: Option<String>,
    /// Keep the aggregate keyword in front of the base name.
    pub keyword: bool,
}

/// A resolved struct or union.
#[derive(Debug)]
pub struct AggregateView {
    pub identifier: String,
    pub is_union: bool,
    pub fields: Vec<FieldView>,
}

#[derive(Debug)]
pub struct ParentView {
    pub name: String,
    pub virtual_: bool,
    pub access: Access,
}

#[derive(Debug)]
pub struct UsingView {
    pub path: Vec<String>,
    pub name: String,
    /// Inheriting constructors re-export without the trailing member name.
    pub is_constructor: bool,
}

#[derive(Debug)]
pub struct MemberView {
    pub qualifier: MemberQualifier,
    pub field: FieldView,
}

/// A resolved class: members bucketed by access level, in emission order.
#[derive(Debug)]
pub struct ClassView {
    pub identifier: String,
    pub class_name: String,
    pub parents: Vec<ParentView>,
    pub usings: Vec<UsingView>,
    pub buckets: Vec<(Access, Vec<MemberView>)>,
}

/// Format-specific translation of resolved records into output text.
pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Whether anonymous definitions are substituted into the referencing
    /// field (`true`) or emitted as separate predecessors (`false`).
    fn inline_anonymous(&self) -> bool;

    fn forward_ref(
        &self,
        identifier: &str,
    ) -> String;

    fn aggregate(
        &self,
        view: &AggregateView,
    ) -> Result<String, RenderError>;

    fn class_decl(
        &self,
        view: &ClassView,
    ) -> Result<String, RenderError>;

    fn enumeration(
        &self,
        identifier: &str,
        values: &[(String, i64)],
    ) -> String;

    fn typedef(
        &self,
        identifier: &str,
        view: &FieldView,
    ) -> Result<String, RenderError>;

    fn function(
        &self,
        identifier: &str,
        desc: &TypeDescriptor,
    ) -> String;

    fn macro_def(
        &self,
        identifier: &str,
        body: &str,
    ) -> String;

    fn template_decl(
        &self,
        params: &[String],
        body: &str,
    ) -> String;

    fn namespace(
        &self,
        identifier: &str,
        body: &str,
    ) -> String;
}

/// Select a renderer by configured name. Unknown names fail before any
/// synthesis begins.
pub fn for_name(name: &str) -> Result<Box<dyn Renderer>, UnknownFormat> {
    match name {
        "c" | "C" => Ok(Box::new(CRenderer)),
        "layout" => Ok(Box::new(LayoutRenderer)),
        other => Err(UnknownFormat(other.to_string())),
    }
}
