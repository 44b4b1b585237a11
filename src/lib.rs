// Module naming follows project convention (PascalCase for subsystem modules)
#[allow(non_snake_case)]
pub mod Core {
    pub mod ByteList;
    pub mod LookupList;
    pub mod alloc;
    pub mod intern;
    pub mod utf;
}
#[allow(non_snake_case)]
pub mod Wire {
    pub mod Message;
    pub mod Message_impl;
    pub mod layout;
    pub mod queue;
    pub use Message::FieldView; // re-export for stable path
}
#[allow(non_snake_case)]
pub mod Bridge;
#[allow(non_snake_case)]
pub mod Resources;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub mod error;
pub mod ffi;

pub use crate::Bridge::{Boundary, LoopbackBoundary, Transport, TransportBuilder};
pub use crate::Core::ByteList::ByteList;
pub use crate::Core::LookupList::LookupList;
pub use crate::Wire::Message::Message;
pub use error::{BridgeError, Result};
