pub mod definition;
pub mod ingest;

pub use definition::*;
pub use ingest::*;
