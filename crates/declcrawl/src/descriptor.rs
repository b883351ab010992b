//! Decomposition of raw C/C++ type spellings.
//!
//! A [`TypeDescriptor`] splits a spelling like `"struct foo **"` or
//! `"char [16]"` into its element base name, namespace path, pointer depth,
//! array dimension and bit-field width, and can recompose a declarator for a
//! given member name. Parsing is best-effort: only an unterminated bracket or
//! parenthesis is an error.

use std::fmt::Write as _;

/// Primitive element types that never resolve against the record store.
pub const PRIMITIVES: &[&str] = &[
    "void",
    "_Bool",
    "bool",
    "char",
    "signed char",
    "unsigned char",
    "short",
    "short int",
    "unsigned short",
    "int",
    "unsigned int",
    "long",
    "long int",
    "unsigned long",
    "long long",
    "unsigned long long",
    "float",
    "double",
    "long double",
    "size_t",
    "ssize_t",
    "wchar_t",
];

const KEYWORDS: &[&str] = &["struct", "union", "class", "enum"];

const QUALIFIERS: &[&str] = &["const", "volatile", "__restrict", "restrict", "register"];

/// Words that may combine into a multi-word primitive base (`unsigned long long`).
const PRIMITIVE_WORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "bool",
];

#[derive(Debug)]
pub enum DescriptorError {
    /// A `[` or `(` with no matching closer.
    Unterminated(String),
}

impl std::fmt::Display for DescriptorError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Unterminated(s) => write!(f, "unterminated bracket in type spelling '{s}'"),
        }
    }
}

impl std::error::Error for DescriptorError {}

/// Options controlling [`TypeDescriptor::render`].
#[derive(Debug, Clone, Copy)]
pub struct RenderOpts {
    /// Keep the `struct|union|class|enum` keyword in front of the base name.
    pub keyword: bool,
    /// Keep the namespace path in front of the base name.
    pub namespace: bool,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            keyword: true,
            namespace: true,
        }
    }
}

/// A decomposed type spelling.
///
/// `base` keeps the aggregate keyword when the source spelling had one
/// (`"struct foo"`), so it can double as a record-store identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub base: String,
    pub namespace: String,
    pub indirection: u32,
    pub dim: u64,
    pub bitfield_width: u32,
    pub is_union: bool,
    pub is_ptr_to_function: bool,
}

impl TypeDescriptor {
    /// Parse a raw type spelling into a descriptor.
    ///
    /// Indirection, array and bit-field suffixes are stripped right-to-left;
    /// a trailing declarator name (as produced by [`render`](Self::render))
    /// is recognized and dropped, so `parse(render(d, n)) == d`.
    pub fn parse(spelling: &str) -> Result<Self, DescriptorError> {
        let mut s = spelling.trim().to_string();

        if !balanced(&s, '[', ']') || !balanced(&s, '(', ')') {
            return Err(DescriptorError::Unterminated(spelling.to_string()));
        }

        // Function prototypes and pointers-to-function keep the whole
        // normalized spelling as their base; only the declarator slot moves.
        if s.contains('(') && !s.contains('{') {
            let is_ptr = s.contains("(*");
            let base = normalize_function_spelling(&s);
            return Ok(Self {
                base,
                namespace: String::new(),
                indirection: 0,
                dim: 0,
                bitfield_width: 0,
                is_union: false,
                is_ptr_to_function: is_ptr,
            });
        }

        let mut bitfield_width = 0u32;
        if let Some(pos) = s.rfind(':') {
            let tail = s[pos + 1..].trim();
            let not_scope = pos == 0 || s.as_bytes()[pos - 1] != b':';
            if not_scope && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                bitfield_width = tail.parse().unwrap_or(0);
                s.truncate(pos);
            }
        }

        let mut dim = 0u64;
        while s.trim_end().ends_with(']') {
            s.truncate(s.trim_end().len());
            let open = match s.rfind('[') {
                Some(i) => i,
                None => return Err(DescriptorError::Unterminated(spelling.to_string())),
            };
            let inner = s[open + 1..s.len() - 1].trim();
            if let Ok(n) = inner.parse::<u64>() {
                dim = if dim == 0 { n } else { dim * n };
            }
            s.truncate(open);
        }

        let tokens = lex(&s);
        let mut iter = tokens.into_iter().peekable();

        let mut keyword: Option<&'static str> = None;
        if let Some(Token::Ident(w)) = iter.peek() {
            if let Some(kw) = KEYWORDS.iter().find(|k| *k == w) {
                keyword = Some(kw);
                iter.next();
            }
        }

        // Element base: either a run of primitive words or one (possibly
        // namespace-qualified) identifier.
        let mut base_name = String::new();
        if let Some(Token::Ident(w)) = iter.peek() {
            if keyword.is_none() && PRIMITIVE_WORDS.contains(&w.as_str()) {
                while let Some(Token::Ident(w)) = iter.peek() {
                    if !PRIMITIVE_WORDS.contains(&w.as_str()) {
                        break;
                    }
                    if !base_name.is_empty() {
                        base_name.push(' ');
                    }
                    base_name.push_str(w);
                    iter.next();
                }
            } else {
                base_name = w.clone();
                iter.next();
            }
        }

        let mut indirection = 0u32;
        let mut trailing_name = false;
        for tok in iter {
            match tok {
                Token::Star | Token::Amp => indirection += 1,
                // One trailing identifier after the base is the declarator
                // name; anything further is ignored best-effort.
                Token::Ident(_) => trailing_name = true,
            }
        }
        let _ = trailing_name;

        let (namespace, short) = split_namespace(&base_name);
        let base = match keyword {
            Some(kw) => format!("{kw} {short}"),
            None => short.to_string(),
        };

        Ok(Self {
            is_union: keyword == Some("union"),
            base,
            namespace,
            indirection,
            dim,
            bitfield_width,
            is_ptr_to_function: false,
        })
    }

    /// Recompose a declarator for `member_name` in the same grammar used by
    /// [`parse`](Self::parse).
    pub fn render(
        &self,
        member_name: &str,
        opts: &RenderOpts,
    ) -> String {
        if self.base.contains('(') && !self.base.contains('{') {
            return render_function(&self.base, member_name, self.is_ptr_to_function);
        }

        let (kw, bare) = split_keyword(&self.base);
        let mut out = String::new();
        if opts.keyword {
            if let Some(kw) = kw {
                out.push_str(kw);
                out.push(' ');
            }
        }
        if opts.namespace && !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            out.push_str("::");
        }
        out.push_str(bare);

        if self.indirection > 0 || !member_name.is_empty() {
            out.push(' ');
        }
        for _ in 0..self.indirection {
            out.push('*');
        }
        out.push_str(member_name);

        if self.dim > 0 {
            let _ = write!(out, "[{}]", self.dim);
        }
        if self.bitfield_width > 0 {
            let _ = write!(out, ":{}", self.bitfield_width);
        }
        out.trim_end().to_string()
    }

    /// The base name without its aggregate keyword.
    pub fn bare_base(&self) -> &str {
        split_keyword(&self.base).1
    }

    /// True when the base is a built-in primitive rather than a store key.
    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.base.as_str())
    }

    /// True when the base names an anonymous aggregate (`"struct ?_1a2b3c4d"`).
    pub fn is_anonymous(&self) -> bool {
        self.base.contains("?_")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Star,
    Amp,
}

/// Lex a suffix-free spelling into identifiers (with `::` and balanced `<>`
/// glued in) and indirection markers. Qualifier words are dropped here.
fn lex(s: &str) -> Vec<Token> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '*' {
            tokens.push(Token::Star);
            i += 1;
        } else if c == '&' {
            tokens.push(Token::Amp);
            i += 1;
        } else if is_ident_char(c) || c == '?' {
            let mut ident = String::new();
            while i < chars.len() {
                let c = chars[i];
                if is_ident_char(c) || c == '?' {
                    ident.push(c);
                    i += 1;
                } else if c == ':' && chars.get(i + 1) == Some(&':') {
                    ident.push_str("::");
                    i += 2;
                } else if c == '<' {
                    // Glue balanced template arguments onto the identifier.
                    let mut depth = 0usize;
                    while i < chars.len() {
                        let c = chars[i];
                        ident.push(c);
                        i += 1;
                        if c == '<' {
                            depth += 1;
                        } else if c == '>' {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                    }
                } else {
                    break;
                }
            }
            if !QUALIFIERS.contains(&ident.as_str()) {
                tokens.push(Token::Ident(ident));
            }
        } else {
            i += 1;
        }
    }
    tokens
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric()
}

fn balanced(
    s: &str,
    open: char,
    close: char,
) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
    }
    depth == 0
}

fn split_namespace(name: &str) -> (String, &str) {
    match name.rfind("::") {
        Some(i) => (name[..i].to_string(), &name[i + 2..]),
        None => (String::new(), name),
    }
}

fn split_keyword(base: &str) -> (Option<&'static str>, &str) {
    for kw in KEYWORDS {
        if let Some(rest) = base.strip_prefix(kw) {
            if let Some(rest) = rest.strip_prefix(' ') {
                return (Some(kw), rest);
            }
        }
    }
    (None, base)
}

/// Collapse whitespace and erase the declarator name from a function
/// spelling, leaving the `(*)` slot free for re-rendering.
fn normalize_function_spelling(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            last_space = true;
            continue;
        }
        if last_space && !out.is_empty() {
            let prev = out.chars().next_back().unwrap_or(' ');
            let glue = matches!(c, ',' | ')' | ']' | '*') || matches!(prev, '(' | '[' | '*');
            if !glue {
                out.push(' ');
            }
        }
        out.push(c);
        last_space = false;
    }
    erase_declarator_name(&out)
}

/// `void (*cb)(int)` -> `void (*)(int)`.
fn erase_declarator_name(s: &str) -> String {
    if let Some(start) = s.find("(*") {
        let after = start + 2;
        if let Some(close) = s[after..].find(')') {
            let inner = &s[after..after + close];
            if !inner.is_empty() && inner.chars().all(|c| is_ident_char(c) || c == ' ') {
                return format!("{}(*){}", &s[..start], &s[after + close + 1..]);
            }
        }
    }
    s.to_string()
}

fn render_function(
    base: &str,
    member_name: &str,
    is_ptr: bool,
) -> String {
    if member_name.is_empty() {
        return base.to_string();
    }
    if is_ptr {
        if let Some(pos) = base.find("(*)") {
            let mut out = String::with_capacity(base.len() + member_name.len());
            out.push_str(&base[..pos]);
            out.push_str("(*");
            out.push_str(member_name);
            out.push(')');
            out.push_str(&base[pos + 3..]);
            return out;
        }
    }
    // Plain prototype: `int (int, char)` -> `int name(int, char)`.
    match base.find('(') {
        Some(pos) => {
            format!("{} {}{}", base[..pos].trim_end(), member_name, &base[pos..])
        },
        None => format!("{base} {member_name}"),
    }
}

/// FNV-1a over the unique source span of an anonymous declaration, truncated
/// to the 8-hex-digit key space used by stored identifiers.
pub fn anonymous_digest(span: &str) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in span.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:08x}", (hash >> 32) as u32 ^ hash as u32)
}

/// Synthetic identifier for an anonymous aggregate: `"<kind> ?_<digest>"`.
pub fn anonymous_key(
    kind_word: &str,
    span: &str,
) -> String {
    format!("{kind_word} ?_{}", anonymous_digest(span))
}

#[cfg(test)]
#[path = "../tests/src/descriptor_unit_tests.rs"]
mod tests;
