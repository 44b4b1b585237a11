use crate::Bridge::{Boundary, Transport};
use crate::Core::ByteList::ByteList;
use crate::Wire::queue::QueueReader;
use libc::{c_void, size_t};
use std::ptr;

// Error codes
pub const DMXP_SUCCESS: i32 = 0;
pub const DMXP_ERROR_NULL_POINTER: i32 = -1;
pub const DMXP_ERROR_INVALID_ARG: i32 = -2;
pub const DMXP_ERROR_EMPTY: i32 = -5;

/// Direct exchange. `io` holds one message; return true after replacing its
/// content with a reply.
pub type DmxpSendMessageFn = extern "C" fn(user: *mut c_void, io: *mut ByteList) -> bool;

/// Queued exchange. `queue` holds outbound records; return true after
/// replacing its content with inbound records.
pub type DmxpPostMessagesFn = extern "C" fn(user: *mut c_void, queue: *mut ByteList) -> bool;

/// Engine side of the boundary as seen from C.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct DmxpBoundaryCallbacks {
    pub user: *mut c_void,
    pub send_message: Option<DmxpSendMessageFn>,
    pub post_messages: Option<DmxpPostMessagesFn>,
}

struct CallbackBoundary {
    callbacks: DmxpBoundaryCallbacks,
}

// The user pointer is owned by the caller of `dmxp_transport_new`, who
// guarantees it may be used from whichever thread drives the transport.
unsafe impl Send for CallbackBoundary {}

impl Boundary for CallbackBoundary {
    fn send_message(&mut self, io: &mut ByteList) -> bool {
        match self.callbacks.send_message {
            Some(callback) => callback(self.callbacks.user, io as *mut ByteList),
            None => false,
        }
    }

    fn post_messages(&mut self, queue: &mut ByteList) -> bool {
        match self.callbacks.post_messages {
            Some(callback) => callback(self.callbacks.user, queue as *mut ByteList),
            None => false,
        }
    }
}

/// Handle to a transport instance (opaque pointer)
pub struct TransportHandle {
    inner: Transport,
}

// -----------------------------------------------------------------------------
// Byte buffer API (used from inside the callbacks)
// -----------------------------------------------------------------------------

/// Pointer to the first byte of `bytes`, or NULL when `bytes` is NULL.
#[no_mangle]
pub extern "C" fn dmxp_bytes_data(bytes: *const ByteList) -> *const u8 {
    if bytes.is_null() {
        return ptr::null();
    }
    unsafe { (*bytes).as_slice().as_ptr() }
}

#[no_mangle]
pub extern "C" fn dmxp_bytes_len(bytes: *const ByteList) -> size_t {
    if bytes.is_null() {
        return 0;
    }
    unsafe { (*bytes).len() }
}

/// Replace the content of `bytes` with `len` bytes copied from `data`.
#[no_mangle]
pub extern "C" fn dmxp_bytes_replace(bytes: *mut ByteList, data: *const u8, len: size_t) -> i32 {
    if bytes.is_null() || (data.is_null() && len != 0) {
        return DMXP_ERROR_NULL_POINTER;
    }
    let src = if len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    };
    unsafe { (*bytes).replace_with(src) };
    DMXP_SUCCESS
}

// -----------------------------------------------------------------------------
// Transport API
// -----------------------------------------------------------------------------

/// Create a transport over the given callbacks.
///
/// # Returns
/// * Pointer to `TransportHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn dmxp_transport_new(callbacks: DmxpBoundaryCallbacks) -> *mut TransportHandle {
    match Transport::builder().build(CallbackBoundary { callbacks }) {
        Ok(transport) => Box::into_raw(Box::new(TransportHandle { inner: transport })),
        Err(e) => {
            tracing::error!(error = %e, "failed to build transport");
            ptr::null_mut()
        }
    }
}

/// Free a transport handle.
#[no_mangle]
pub extern "C" fn dmxp_transport_free(handle: *mut TransportHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

/// Run one flush cycle.
///
/// # Returns
/// * Number of inbound messages dispatched, or a negative error code.
#[no_mangle]
pub extern "C" fn dmxp_transport_flush(handle: *mut TransportHandle) -> i32 {
    if handle.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let transport = unsafe { &(*handle).inner };
    transport.flush_cycle().min(i32::MAX as usize) as i32
}

/// Queue an already encoded message for the next flush.
///
/// # Arguments
/// * `data` - One encoded message (no record prefix).
/// * `len` - Length of data.
#[no_mangle]
pub extern "C" fn dmxp_transport_post(
    handle: *mut TransportHandle,
    data: *const u8,
    len: size_t,
) -> i32 {
    if handle.is_null() || data.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let transport = unsafe { &(*handle).inner };
    let slice = unsafe { std::slice::from_raw_parts(data, len) };

    let message = transport.decode(slice);
    transport.post(message);
    DMXP_SUCCESS
}

/// Send an encoded message now and copy the reply into `out_buf`.
///
/// # Arguments
/// * `out_len` - Input: size of buf, Output: size of reply.
///
/// # Returns
/// * 0 on success.
/// * DMXP_ERROR_EMPTY if there was no reply.
/// * DMXP_ERROR_INVALID_ARG if the buffer is too small; `out_len` holds the
///   required size and the reply is discarded.
#[no_mangle]
pub extern "C" fn dmxp_transport_send(
    handle: *mut TransportHandle,
    data: *const u8,
    len: size_t,
    out_buf: *mut u8,
    out_len: *mut size_t,
) -> i32 {
    if handle.is_null() || data.is_null() || out_len.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let transport = unsafe { &(*handle).inner };
    let slice = unsafe { std::slice::from_raw_parts(data, len) };
    let max_len = unsafe { *out_len };

    let message = transport.decode(slice);
    let Some(reply) = transport.send(message) else {
        unsafe { *out_len = 0 };
        return DMXP_ERROR_EMPTY;
    };

    let bytes = reply.as_bytes();
    let code = if bytes.len() > max_len {
        DMXP_ERROR_INVALID_ARG
    } else if out_buf.is_null() {
        DMXP_ERROR_NULL_POINTER
    } else {
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), out_buf, bytes.len()) };
        DMXP_SUCCESS
    };
    unsafe { *out_len = bytes.len() };
    transport.recycle(reply);
    code
}

/// Serve an engine-initiated request held in `io`.
///
/// # Returns
/// * 1 if `io` now holds a reply, 0 if not, negative on error.
#[no_mangle]
pub extern "C" fn dmxp_transport_dispatch_direct(
    handle: *mut TransportHandle,
    io: *mut ByteList,
) -> i32 {
    if handle.is_null() || io.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let transport = unsafe { &(*handle).inner };
    let io = unsafe { &mut *io };
    transport.dispatch_direct(io) as i32
}

/// Number of records in an encoded queue, or a negative error code.
#[no_mangle]
pub extern "C" fn dmxp_queue_count(queue: *const ByteList) -> i32 {
    if queue.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let queue = unsafe { &*queue };
    QueueReader::new(queue.as_slice()).count().min(i32::MAX as usize) as i32
}

/// Allocate an empty byte buffer, for callers that drive `dispatch_direct`.
#[no_mangle]
pub extern "C" fn dmxp_bytes_new() -> *mut ByteList {
    Box::into_raw(Box::new(ByteList::new()))
}

#[no_mangle]
pub extern "C" fn dmxp_bytes_free(bytes: *mut ByteList) {
    if !bytes.is_null() {
        unsafe {
            let _ = Box::from_raw(bytes);
        }
    }
}
