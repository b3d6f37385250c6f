pub mod loader;
pub mod schema;

pub use loader::{
    load_builtin, load_from_path, load_from_str, resolve_profile, ConfigError, ProfileOrigin,
    PROFILE_ENV,
};
pub use schema::{
    Alias, CallSite, Field, Helpers, Linkage, Lowering, Metadata, OutParam, Profile, Returns,
    ValidationError, ValidationIssue,
};
