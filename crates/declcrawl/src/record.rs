//! The canonical, storable representation of one declaration.
//!
//! Records are produced by the normalizer, written once per crawl, and read
//! back by the synthesizer. The persisted shape (`id`, `tag`, `_in`, `src`,
//! `_class` + kind-specific fields) must stay stable across crawl and
//! synthesis invocations; an unknown `_class` discriminator fails
//! deserialization instead of propagating missing fields downstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Closed set of declaration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Typedef,
    Struct,
    Union,
    Class,
    Enum,
    Function,
    Macro,
    Template,
    Namespace,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typedef => "typedef",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Function => "function",
            Self::Macro => "macro",
            Self::Template => "template",
            Self::Namespace => "namespace",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a struct or union, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub ty: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Field {
    pub fn new(
        ty: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
            comment: None,
        }
    }
}

/// C++ access level of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Protected,
    Private,
    /// Friend declarations and anything clang leaves unqualified.
    #[default]
    Unspecified,
}

impl Access {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Public => Some("public"),
            Self::Protected => Some("protected"),
            Self::Private => Some("private"),
            Self::Unspecified => None,
        }
    }
}

/// Storage/dispatch qualifier of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberQualifier {
    #[default]
    None,
    Static,
    Virtual,
    Friend,
}

impl MemberQualifier {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Static => Some("static"),
            Self::Virtual => Some("virtual"),
            Self::Friend => Some("friend"),
        }
    }
}

/// One entry of a class body, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "member")]
pub enum ClassMember {
    /// Base-class specifier.
    #[serde(rename = "parent")]
    Parent {
        name: String,
        #[serde(rename = "virtual")]
        virtual_: bool,
        access: Access,
    },
    /// `using` re-export of an inherited member.
    #[serde(rename = "using")]
    Using {
        path: Vec<String>,
        name: String,
    },
    /// Data or function member.
    #[serde(rename = "data")]
    Data {
        #[serde(default)]
        qualifier: MemberQualifier,
        ty: String,
        #[serde(default)]
        mangled: String,
        name: String,
        #[serde(default)]
        access: Access,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
}

/// Kind-specific payload, discriminated by `_class` in the persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_class")]
pub enum RecordPayload {
    #[serde(rename = "cTypedef")]
    Typedef {
        underlying: String,
    },
    #[serde(rename = "cStruct")]
    Struct {
        fields: Vec<Field>,
    },
    #[serde(rename = "cUnion")]
    Union {
        fields: Vec<Field>,
    },
    #[serde(rename = "cClass")]
    Class {
        members: Vec<ClassMember>,
    },
    #[serde(rename = "cEnum")]
    Enum {
        values: BTreeMap<String, i64>,
    },
    #[serde(rename = "cFunc")]
    Function {
        prototype: String,
    },
    #[serde(rename = "cMacro")]
    Macro {
        body: String,
    },
    #[serde(rename = "cTemplate")]
    Template {
        params: Vec<String>,
        body: Box<Record>,
    },
    #[serde(rename = "cNamespace")]
    Namespace {
        local: Vec<String>,
    },
}

/// One persisted declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Path of the file the declaration was found in.
    #[serde(rename = "_in")]
    pub source_file: String,
    /// Identifier of the enclosing record for nested/anonymous declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(flatten)]
    pub payload: RecordPayload,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        source_file: impl Into<String>,
        payload: RecordPayload,
    ) -> Self {
        Self {
            id: id.into(),
            tag: None,
            source_file: source_file.into(),
            src: None,
            payload,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match &self.payload {
            RecordPayload::Typedef { .. } => RecordKind::Typedef,
            RecordPayload::Struct { .. } => RecordKind::Struct,
            RecordPayload::Union { .. } => RecordKind::Union,
            RecordPayload::Class { .. } => RecordKind::Class,
            RecordPayload::Enum { .. } => RecordKind::Enum,
            RecordPayload::Function { .. } => RecordKind::Function,
            RecordPayload::Macro { .. } => RecordKind::Macro,
            RecordPayload::Template { .. } => RecordKind::Template,
            RecordPayload::Namespace { .. } => RecordKind::Namespace,
        }
    }

    /// True for synthetic content-hash identifiers.
    pub fn is_anonymous(&self) -> bool {
        self.id.contains("?_")
    }
}
