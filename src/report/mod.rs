pub mod formatter;
pub mod record;

pub use formatter::*;
pub use record::*;
