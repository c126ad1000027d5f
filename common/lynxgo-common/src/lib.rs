pub mod context;
pub mod frontend;
pub mod input;
