pub mod consolidate;
pub mod contextual;
pub mod contradiction;
pub mod extract;
pub mod suggest;
