pub mod env;
pub mod pattern;
