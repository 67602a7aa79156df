//! Email templates and variable expansion
//!
//! Templates are authored by non-developers against whichever naming
//! convention was visible to them, so lookup is layered and permissive:
//! flat canonical variables, then the raw payload, then ancillary object
//! trees for nested paths.

pub mod renderer;
pub mod types;

pub use renderer::{TemplateContext, TemplateRenderer};
pub use types::EmailTemplate;
