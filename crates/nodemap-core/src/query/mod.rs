//! Query translation.
//!
//! This module provides:
//! - Ordered criteria maps
//! - Compilation of criteria into a full-text query string
//! - Parsing of dynamic `findBy…` / `findOneBy…` call names

mod compiler;
mod criteria;
mod finder;

pub use compiler::{build_term, compile};
pub use criteria::Criteria;
pub use finder::{FinderCall, FinderKind};
