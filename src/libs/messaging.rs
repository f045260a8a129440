pub mod engine;
pub mod error;
pub mod validation;
pub mod view;
