pub mod identity;
pub mod tokens;
