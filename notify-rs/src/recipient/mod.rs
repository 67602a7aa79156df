//! Recipient resolution

pub mod resolver;

pub use resolver::{RecipientResolver, ResolvedRecipient};
