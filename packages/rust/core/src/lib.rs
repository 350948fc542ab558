//! Export domain logic for hcexport.
//!
//! This crate turns a cached help-center snapshot into output artifacts:
//! content graph and permalink index, in-body link rewriting, the static HTML
//! site and the WordPress feed, tied together by [`pipeline::run_export`].

pub mod graph;
pub mod pipeline;
pub mod rewrite;
pub mod site;
pub mod slug;
pub mod wordpress;
