//! rustbuffer-patcher: post-processing for UniFFI-generated Go bindings
//!
//! Go 1.24+ cgo rejects `type RustBuffer = C.RustBuffer`, the alias the
//! binding generator uses to pass buffers across the native boundary. This
//! crate rewrites the generated file so `RustBuffer` becomes a struct of its
//! own with explicit conversions at every crossing.
//!
//! # Architecture
//!
//! A fixed pipeline of text rewrites ([`rewrite::Patcher`]) runs over one
//! in-memory copy of the file:
//!
//! 1. linkage directives after the cgo include anchor
//! 2. the alias materialized into a struct plus conversion helpers
//! 3. literal call-site substitutions
//! 4. `Lower` calls at use sites wrapped with the to-native helper
//! 5. native-call returns in buffer-returning literals wrapped with the
//!    from-native helper (multi-line calls included)
//! 6. out-parameter assignments wrapped with the to-native helper
//! 7. doubled wrappers collapsed
//!
//! Nothing is parsed into an AST. The stages match literal shapes described
//! by a [`config::Profile`], and two small line state machines decide where
//! wrapping is legal.
//!
//! # Safety
//!
//! - Patching is idempotent: a second run changes nothing
//! - Anchors that should be unique are checked before rewriting
//! - Unbalanced brackets abort the run instead of producing a mis-wrap
//! - Atomic file writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```no_run
//! let source = std::fs::read_to_string("pkg/rustpushgo/rustpushgo.go")?;
//! let patched = rustbuffer_patcher::patch(&source)?;
//! std::fs::write("pkg/rustpushgo/rustpushgo.go", patched)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod file;
pub mod rewrite;

// Re-exports
pub use config::{
    load_builtin, load_from_path, load_from_str, resolve_profile, ConfigError, Profile, ProfileOrigin,
};
pub use file::{read_source, write_atomic, FileError};
pub use rewrite::{Drift, LineDelta, PatchError, PatchReport, Patched, Patcher, Stage, StageReport};

/// Patch `text` with the built-in profile.
pub fn patch(text: &str) -> Result<String, PatchError> {
    Ok(Patcher::builtin()?.patch(text)?.text)
}
