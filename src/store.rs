use std::io::Read;

use crate::error::StoreError;

/// One flow visible in a store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowHandle {
    pub id: String,
    pub name: String,
}

impl FlowHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        FlowHandle {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A source of flow definitions. This could be the live environment API,
/// an exported solution on disk, or a test double.
pub trait FlowStore {
    /// Lists every flow the store knows about.
    fn list_flows(&self) -> Result<Vec<FlowHandle>, StoreError>;

    /// Opens the raw definition document of one flow.
    ///
    /// The result is a streaming reader, so a caller never holds more
    /// than one definition in memory at a time.
    fn open_definition(&self, handle: &FlowHandle) -> Result<Box<dyn Read>, StoreError>;
}
