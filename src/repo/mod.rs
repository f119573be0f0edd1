//! Remote repository acquisition.

pub mod cloner;

pub use cloner::{clone_into, current_commit, is_clone_url, CloneOptions};
