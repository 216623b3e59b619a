//! fOS Components
//!
//! Component registry and lifecycle on top of the template compiler and the
//! diff engine:
//!
//! - [`Runtime`]: tag registry, mount/render/unmount, props and light
//!   content, event delegation and the cooperative scheduler
//! - [`ComponentDefinition`]: typed definition record with optional hooks
//! - [`RuntimeConfig`]: frame budget, update mode and convergence limits
//! - [`DiagnosticsSink`]: where hook and handler failures are reported
//! - [`ComponentLoader`]: path to compiled component
//!
//! Document conventions: a mounted host carries the [`READY_ATTRIBUTE`]
//! marker and one `<div class="fos-content">` content root. A direct child
//! with class `fos-prerendered` is adopted as the content root on mount.
//! Attributes prefixed with `:` are props.

mod config;
mod definition;
mod diagnostics;
mod error;
mod events;
mod instance;
mod lifecycle;
mod loader;
mod runtime;
mod scheduler;

pub use config::RuntimeConfig;
pub use definition::{
    is_valid_custom_element_name, ComponentDefinition, EventBinding, EventHandler, HandlerTable, Hook, Hooks,
};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticsSink, Phase, TracingSink};
pub use error::{DefinitionError, LoadError, RuntimeError};
pub use events::{DispatchOutcome, Event};
pub use instance::{Instance, InstanceState, LightChild, LightContent};
pub use loader::{ComponentLoader, SourceLoader};
pub use runtime::{camel_case, Runtime, RuntimeResult};
pub use scheduler::{Queue, Scheduler, TickReport};

/// Marks a host whose first render completed
pub const READY_ATTRIBUTE: &str = "fos-ready";

/// Class of the generated content root
pub const CONTENT_CLASS: &str = "fos-content";

/// Class of a pre-rendered content block
pub const PRERENDERED_CLASS: &str = "fos-prerendered";

/// Prefix of prop attributes
pub const PROP_PREFIX: char = ':';
