//! Drives the external clang front end.
//!
//! One crawl runs clang twice per file: an AST dump
//! (`-Xclang -ast-dump=json`) whose stdout is deserialized through
//! `clang-ast` and whose stderr is regex-parsed into diagnostics, and a
//! preprocessor pass (`-dD -E`) that recovers macro definitions, which the
//! JSON dump does not carry.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tracing::debug;

use crate::provider::clang::Node;
use crate::provider::cursor::{self, Cursor, Diagnostic, Severity};

#[derive(Debug)]
pub enum ProviderError {
    Io(PathBuf, std::io::Error),
    Spawn(String, std::io::Error),
    AstParse(String),
    /// Strict mode: an error diagnostic makes the whole file's batch invalid.
    Fatal(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "{}: {e}", path.display()),
            Self::Spawn(cmd, e) => write!(f, "failed to launch {cmd}: {e}"),
            Self::AstParse(msg) => write!(f, "clang AST dump could not be parsed: {msg}"),
            Self::Fatal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Options for one crawl invocation.
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    /// Fail the file on any unresolved type instead of recovering.
    pub strict: bool,
    /// Parse as C++ even without a telling file extension.
    pub cxx: bool,
    /// Extra arguments passed through to clang (include paths, defines).
    pub clang_args: Vec<String>,
}

/// A macro definition recovered from the preprocessor pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub body: String,
}

/// Everything the normalizer needs from one crawled file.
#[derive(Debug)]
pub struct CrawlOutput {
    pub main_file: String,
    pub source: String,
    pub cursors: Vec<Cursor>,
    pub diagnostics: Vec<Diagnostic>,
    pub macros: Vec<MacroDef>,
    pub cxx: bool,
}

/// Shells out to clang and adapts its output to the cursor contract.
pub struct ClangDriver {
    clang: String,
    /// Compiled regex for parsing diagnostic lines.
    diagnostic_re: Regex,
    define_re: Regex,
    line_marker_re: Regex,
}

impl Default for ClangDriver {
    fn default() -> Self {
        Self::new("clang")
    }
}

impl ClangDriver {
    pub fn new(clang: impl Into<String>) -> Self {
        Self {
            clang: clang.into(),
            diagnostic_re: Regex::new(r"^(.*?):(\d+):(\d+):\s*(fatal error|error|warning|note):\s*(.*)$").unwrap(),
            define_re: Regex::new(r"^#define\s+([A-Za-z_][A-Za-z0-9_]*)(.*)$").unwrap(),
            line_marker_re: Regex::new(r#"^#\s+\d+\s+"([^"]*)""#).unwrap(),
        }
    }

    /// Crawl one file. A provider-level failure (spawn error, unparseable
    /// dump, or a fatal diagnostic in strict mode) invalidates the whole
    /// file; the caller discards the batch.
    pub fn crawl(
        &self,
        path: &Path,
        request: &CrawlRequest,
    ) -> Result<CrawlOutput, ProviderError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Io(path.to_path_buf(), e))?;
        let mut cxx = request.cxx || has_cxx_extension(path);

        let (mut stdout, mut diagnostics) = self.ast_dump(path, cxx, &request.clang_args)?;

        // Headers are parsed as C by default; retry as C++ when the
        // diagnostics show C++ constructs.
        if !cxx && diagnostics.iter().any(looks_like_cxx_error) {
            debug!("{}: retrying as c++", path.display());
            cxx = true;
            let (out, diags) = self.ast_dump(path, true, &request.clang_args)?;
            stdout = out;
            diagnostics = diags;
        }

        if request.strict {
            if let Some(err) = diagnostics.iter().find(|d| d.severity >= Severity::Error) {
                return Err(ProviderError::Fatal(format!(
                    "{}:{}:{}: {}",
                    err.file, err.line, err.col, err.message
                )));
            }
        }

        let root: Node = serde_json::from_str(&stdout)
            .map_err(|e| ProviderError::AstParse(e.to_string()))?;

        let main_file = path.display().to_string();
        let cursors = cursor::translation_unit_cursors(&root, &main_file);
        let macros = self.macro_dump(path, cxx, &request.clang_args)?;

        debug!(
            "{}: {} top-level cursors, {} macros, {} diagnostics",
            path.display(),
            cursors.len(),
            macros.len(),
            diagnostics.len()
        );

        Ok(CrawlOutput {
            main_file,
            source,
            cursors,
            diagnostics,
            macros,
            cxx,
        })
    }

    fn ast_dump(
        &self,
        path: &Path,
        cxx: bool,
        extra_args: &[String],
    ) -> Result<(String, Vec<Diagnostic>), ProviderError> {
        let mut args = vec![
            "-Xclang".to_string(),
            "-ast-dump=json".to_string(),
            "-fsyntax-only".to_string(),
            "-fno-color-diagnostics".to_string(),
            "-ferror-limit=0".to_string(),
            "-fparse-all-comments".to_string(),
        ];
        if cxx {
            args.extend(cxx_args());
        }
        args.extend(extra_args.iter().cloned());
        args.push(path.display().to_string());

        debug!("AST dump: {} {}", self.clang, args.join(" "));

        let output = Command::new(&self.clang)
            .args(&args)
            .output()
            .map_err(|e| ProviderError::Spawn(self.clang.clone(), e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = self.parse_diagnostics(&stderr);
        for d in &diagnostics {
            if d.severity >= Severity::Warning {
                debug!("clang: {}:{}:{}: {}", d.file, d.line, d.col, d.message);
            }
        }
        Ok((String::from_utf8_lossy(&output.stdout).into_owned(), diagnostics))
    }

    fn macro_dump(
        &self,
        path: &Path,
        cxx: bool,
        extra_args: &[String],
    ) -> Result<Vec<MacroDef>, ProviderError> {
        let mut args = vec!["-dD".to_string(), "-E".to_string(), "-fno-color-diagnostics".to_string()];
        if cxx {
            args.extend(cxx_args());
        }
        args.extend(extra_args.iter().cloned());
        args.push(path.display().to_string());

        let output = Command::new(&self.clang)
            .args(&args)
            .output()
            .map_err(|e| ProviderError::Spawn(self.clang.clone(), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(self.parse_macro_defs(&stdout, &path.display().to_string()))
    }

    fn parse_diagnostics(
        &self,
        stderr: &str,
    ) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for line in stderr.lines() {
            let Some(caps) = self.diagnostic_re.captures(line) else {
                continue;
            };
            let severity = match &caps[4] {
                "fatal error" => Severity::Fatal,
                "error" => Severity::Error,
                "warning" => Severity::Warning,
                _ => Severity::Note,
            };
            out.push(Diagnostic {
                severity,
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                col: caps[3].parse().unwrap_or(0),
                message: caps[5].to_string(),
            });
        }
        out
    }

    /// Pick `#define` lines out of `-dD -E` output, keeping only those
    /// defined in `main_file` (the line markers track the current file).
    fn parse_macro_defs(
        &self,
        stdout: &str,
        main_file: &str,
    ) -> Vec<MacroDef> {
        let mut current_file = String::new();
        let mut out = Vec::new();
        for line in stdout.lines() {
            if let Some(caps) = self.line_marker_re.captures(line) {
                current_file = caps[1].to_string();
                continue;
            }
            if current_file != main_file {
                continue;
            }
            let Some(caps) = self.define_re.captures(line) else {
                continue;
            };
            let name = caps[1].to_string();
            if name.starts_with("__") {
                continue;
            }
            let body = caps[2].trim().to_string();
            out.push(MacroDef {
                name,
                body,
            });
        }
        out
    }
}

fn cxx_args() -> Vec<String> {
    vec!["-x".to_string(), "c++".to_string(), "-std=c++11".to_string()]
}

fn has_cxx_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("hpp" | "hh" | "hxx" | "cpp" | "cc" | "cxx")
    )
}

fn looks_like_cxx_error(d: &Diagnostic) -> bool {
    d.severity >= Severity::Error
        && (d.message.contains("expected ';'") || d.message.contains("'namespace'"))
}

#[cfg(test)]
#[path = "../../tests/src/compiler_unit_tests.rs"]
mod tests;
