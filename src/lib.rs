pub mod analyzer;
pub mod error;
pub mod inference;
pub mod narrative;
pub mod parser;
pub mod risk;
pub mod rules;
pub mod types;
pub mod writer;

pub use analyzer::*;
pub use error::*;
pub use inference::*;
pub use narrative::*;
pub use parser::*;
pub use risk::*;
pub use rules::*;
pub use types::*;
pub use writer::*;
