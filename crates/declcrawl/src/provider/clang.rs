//! Typed deserialization of `clang -ast-dump=json` output.
//!
//! Only the node kinds the normalizer consumes get a typed variant; the
//! `Other` fallback skips everything else.

use clang_ast::{BareSourceLocation, SourceLocation};
use serde::Deserialize;

pub type Node = clang_ast::Node<Clang>;

/// Clang AST node kinds relevant to declaration crawling.
#[derive(Deserialize)]
pub enum Clang {
    // --- Declarations ---
    RecordDecl(RecordData),
    CXXRecordDecl(RecordData),
    EnumDecl(DeclData),
    EnumConstantDecl(DeclData),
    TypedefDecl(DeclData),
    FieldDecl(FieldData),
    IndirectFieldDecl(FieldData),
    VarDecl(FieldData),
    FunctionDecl(FunctionData),
    CXXMethodDecl(FunctionData),
    CXXConstructorDecl(FunctionData),
    CXXDestructorDecl(FunctionData),
    FriendDecl(DeclData),
    UsingDecl(DeclData),
    AccessSpecDecl(AccessData),
    NamespaceDecl(DeclData),
    FunctionTemplateDecl(DeclData),
    ClassTemplateDecl(DeclData),
    ClassTemplatePartialSpecializationDecl(DeclData),
    TemplateTypeParmDecl(DeclData),
    NonTypeTemplateParmDecl(DeclData),

    // --- Comments and literals the normalizer reads through ---
    FullComment(CommentData),
    ParagraphComment(CommentData),
    TextComment(CommentData),
    ConstantExpr(ValueData),

    // --- Catch-all ---
    // The `loc` and `range` fields MUST be deserialized even for unrecognized
    // node kinds. The `clang-ast` crate tracks "current file" state across the
    // deserialization stream via `SourceLocation`; if we skip locations for
    // nodes that set the file path, all subsequent nodes inherit an empty
    // file.
    #[allow(dead_code)]
    Other {
        #[serde(default)]
        loc: Option<SourceLocation>,
        #[serde(default)]
        range: Option<clang_ast::SourceRange>,
    },
}

/// Common data for declaration nodes.
#[derive(Deserialize, Debug)]
pub struct DeclData {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    pub value: Option<serde_json::Value>,
}

/// Struct/union/class declaration data. `tag_used` distinguishes the three;
/// `bases` carries C++ base-class specifiers (they are not child nodes in the
/// JSON dump).
#[derive(Deserialize, Debug)]
pub struct RecordData {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "tagUsed")]
    pub tag_used: Option<String>,
    #[serde(rename = "completeDefinition")]
    pub complete_definition: Option<bool>,
    #[serde(default)]
    pub bases: Vec<BaseSpec>,
}

/// One entry of a `CXXRecordDecl`'s `bases` array.
#[derive(Deserialize, Debug)]
pub struct BaseSpec {
    pub access: Option<String>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "isVirtual")]
    pub is_virtual: Option<bool>,
}

/// Field and variable declaration data.
#[derive(Deserialize, Debug)]
pub struct FieldData {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "isBitfield")]
    pub is_bitfield: Option<bool>,
    #[serde(rename = "storageClass")]
    pub storage_class: Option<String>,
    #[serde(rename = "mangledName")]
    pub mangled_name: Option<String>,
}

/// Function and method declaration data.
#[derive(Deserialize, Debug)]
pub struct FunctionData {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "mangledName")]
    pub mangled_name: Option<String>,
    #[serde(rename = "storageClass")]
    pub storage_class: Option<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct AccessData {
    pub access: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
}

#[derive(Deserialize, Debug)]
pub struct CommentData {
    pub text: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
}

#[derive(Deserialize, Debug)]
pub struct ValueData {
    pub value: Option<serde_json::Value>,
    pub loc: Option<SourceLocation>,
    pub range: Option<clang_ast::SourceRange>,
}

/// Clang's qualified type representation.
#[derive(Deserialize, Debug)]
pub struct QualType {
    #[serde(rename = "qualType")]
    pub qual_type: Option<String>,
}

impl QualType {
    pub fn spelling(&self) -> &str {
        self.qual_type.as_deref().unwrap_or("")
    }
}

/// Extract the best concrete source location from a [`SourceLocation`].
pub fn resolve_loc(loc: &SourceLocation) -> Option<&BareSourceLocation> {
    loc.spelling_loc.as_ref().or(loc.expansion_loc.as_ref())
}
