pub mod error;
pub mod key;
pub mod types;

pub use error::*;
pub use key::*;
pub use types::*;
