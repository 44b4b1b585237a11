use super::*;
use crate::Core::ByteList::ByteList;
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for MessagePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_message_pool(self, f)
    }
}

impl fmt::Debug for ByteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_byte_list(self, f)
    }
}
