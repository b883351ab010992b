pub mod config;
pub mod descriptor;
pub mod normalizer;
pub mod provider;
pub mod record;
pub mod render;
pub mod store;
pub mod synth;

pub use descriptor::{RenderOpts, TypeDescriptor, anonymous_digest, anonymous_key};
pub use normalizer::{CrawlOptions, NormalizeError, normalize};
pub use provider::{
    ClangDriver, CrawlOutput, CrawlRequest, Cursor, CursorKind, Diagnostic, MacroDef,
    ProviderError, Severity, SourceLoc, SourceSpan,
};
pub use record::{Access, ClassMember, Field, MemberQualifier, Record, RecordKind, RecordPayload};
pub use render::{CRenderer, LayoutRenderer, RenderError, Renderer};
pub use store::{JsonStore, Query, RecordStore, StoreError};
pub use synth::{SynthDiagnostic, Synthesis, Synthesizer};
