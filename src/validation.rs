//! Post-expansion checks over the rewritten tree.

pub mod residue;

pub use residue::validate;
