// Output generation module

pub mod jsonl;
pub mod prompt;
pub mod render;
pub mod tokens;

pub use jsonl::*;
pub use prompt::*;
pub use render::*;
pub use tokens::*;
