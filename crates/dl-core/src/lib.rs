pub mod error;
pub mod library;
pub mod operators;
pub mod types;
pub mod value;

pub use error::DialogueError;
pub use library::*;
pub use operators::*;
pub use types::*;
pub use value::*;
