pub mod candidate;
pub mod screening;
