pub mod analyze;
pub mod completion;
pub mod config;
pub mod export;
pub mod tokens;
pub mod tree;
