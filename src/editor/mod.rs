pub mod flatten;
pub mod persist;
