pub mod artifact;
pub mod code;
pub mod config;
pub mod error;
pub mod finding;
pub mod fix;
pub mod frontmatter;
pub mod index;
pub mod io;
pub mod layer;
pub mod paths;
pub mod reference;
pub mod resolver;
pub mod scan;
pub mod types;
pub mod validate;

pub use error::{Result, SddError};
