//! Repository facade.
//!
//! [`Repository`] exposes `find`, `find_all`, `find_by`, `find_one_by`,
//! `create_query` and dynamic `findBy…` / `findOneBy…` dispatch for one
//! entity type. [`Mapper`] builds repositories from shared collaborators.

mod finder;
mod mapper;

pub use finder::{FinderOutput, Repository};
pub use mapper::Mapper;
