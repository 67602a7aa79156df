//! Utility functions

pub mod email;

pub use email::{is_valid_email, parse_address_list, validate_email};
