//! Visibility resolution, repeated groups and completion for schema-driven
//! forms.
//!
//! [`FormSession`] is the entry point: it owns the answer map for a whole
//! [`form_model::FormCatalog`] and keeps every page's visible fields in sync
//! as answers change, group instances come and go, and documents are loaded.

pub mod completion;
pub mod error;
pub mod groups;
pub mod resolver;
pub mod session;

pub use completion::{Completion, count_completion};
pub use error::{EngineError, Result};
pub use groups::{GroupDefinition, RepeatedGroupManager};
pub use resolver::{
    ChangeOutcome, DEFAULT_MAX_CHAIN_DEPTH, DependencyResolver, FieldLayout, LayoutExtension,
    VisibilityState,
};
pub use session::{FormSession, SessionOptions};
