pub mod commerce;
pub mod common;
pub mod health;
