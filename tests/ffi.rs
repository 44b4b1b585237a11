// C ABI round trips. The callbacks record into process-wide state, so these
// tests run one at a time.

use dmxp_bridge::ffi::*;
use dmxp_bridge::{ByteList, Message};
use libc::c_void;
use serial_test::serial;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

static POSTED_RECORDS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn answer_with_pong(_user: *mut c_void, io: *mut ByteList) -> bool {
    let len = dmxp_bytes_len(io);
    let data = dmxp_bytes_data(io);
    let request = Message::from_bytes(unsafe { std::slice::from_raw_parts(data, len) });

    let mut reply = Message::new("", request.id(), 0.0);
    reply.set_str("answer", "pong");
    let bytes = reply.as_bytes();
    dmxp_bytes_replace(io, bytes.as_ptr(), bytes.len()) == DMXP_SUCCESS
}

extern "C" fn count_posts(user: *mut c_void, queue: *mut ByteList) -> bool {
    let count = dmxp_queue_count(queue);
    POSTED_RECORDS.fetch_add(count.max(0) as usize, Ordering::SeqCst);
    let calls = unsafe { &*(user as *const AtomicUsize) };
    calls.fetch_add(1, Ordering::SeqCst);
    false
}

fn callbacks(user: &AtomicUsize) -> DmxpBoundaryCallbacks {
    DmxpBoundaryCallbacks {
        user: user as *const AtomicUsize as *mut c_void,
        send_message: Some(answer_with_pong),
        post_messages: Some(count_posts),
    }
}

#[test]
#[serial]
fn post_then_flush_reaches_the_callback() {
    POSTED_RECORDS.store(0, Ordering::SeqCst);
    let calls = AtomicUsize::new(0);
    let handle = dmxp_transport_new(callbacks(&calls));
    assert!(!handle.is_null());

    for i in 0..3 {
        let m = Message::new("Tick", i + 1, 0.0);
        let bytes = m.as_bytes();
        assert_eq!(dmxp_transport_post(handle, bytes.as_ptr(), bytes.len()), DMXP_SUCCESS);
    }
    assert_eq!(dmxp_transport_flush(handle), 0);
    assert_eq!(POSTED_RECORDS.load(Ordering::SeqCst), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    dmxp_transport_free(handle);
}

#[test]
#[serial]
fn send_copies_reply_out() {
    let calls = AtomicUsize::new(0);
    let handle = dmxp_transport_new(callbacks(&calls));

    let request = Message::new("Ping", 42, 0.0);
    let bytes = request.as_bytes();

    // too small: the required size is reported
    let mut small = [0u8; 4];
    let mut len = small.len();
    let code = dmxp_transport_send(handle, bytes.as_ptr(), bytes.len(), small.as_mut_ptr(), &mut len);
    assert_eq!(code, DMXP_ERROR_INVALID_ARG);
    assert!(len > small.len());

    let mut out = vec![0u8; len];
    let mut len = out.len();
    let code = dmxp_transport_send(handle, bytes.as_ptr(), bytes.len(), out.as_mut_ptr(), &mut len);
    assert_eq!(code, DMXP_SUCCESS);

    let mut reply = Message::from_bytes(&out[..len]);
    assert!(reply.is_reply());
    assert_eq!(reply.id(), 42);
    assert_eq!(reply.get_string("answer"), "pong");

    dmxp_transport_free(handle);
}

#[test]
#[serial]
fn missing_callbacks_mean_no_reply() {
    let handle = dmxp_transport_new(DmxpBoundaryCallbacks {
        user: ptr::null_mut(),
        send_message: None,
        post_messages: None,
    });

    let request = Message::new("Ping", 1, 0.0);
    let bytes = request.as_bytes();
    let mut out = [0u8; 64];
    let mut len = out.len();
    let code = dmxp_transport_send(handle, bytes.as_ptr(), bytes.len(), out.as_mut_ptr(), &mut len);
    assert_eq!(code, DMXP_ERROR_EMPTY);
    assert_eq!(len, 0);
    assert_eq!(dmxp_transport_flush(handle), 0);

    dmxp_transport_free(handle);
}

#[test]
#[serial]
fn dispatch_direct_without_handler_keeps_buffer() {
    let handle = dmxp_transport_new(DmxpBoundaryCallbacks {
        user: ptr::null_mut(),
        send_message: None,
        post_messages: None,
    });
    let io = dmxp_bytes_new();
    let request = Message::new("Unhandled", 9, 0.0);
    let bytes = request.as_bytes();
    assert_eq!(dmxp_bytes_replace(io, bytes.as_ptr(), bytes.len()), DMXP_SUCCESS);

    assert_eq!(dmxp_transport_dispatch_direct(handle, io), 0);
    assert_eq!(dmxp_bytes_len(io), bytes.len());

    dmxp_bytes_free(io);
    dmxp_transport_free(handle);
}

#[test]
#[serial]
fn null_arguments_are_rejected() {
    assert_eq!(dmxp_transport_flush(ptr::null_mut()), DMXP_ERROR_NULL_POINTER);
    assert_eq!(
        dmxp_transport_post(ptr::null_mut(), ptr::null(), 0),
        DMXP_ERROR_NULL_POINTER
    );
    assert_eq!(
        dmxp_transport_dispatch_direct(ptr::null_mut(), ptr::null_mut()),
        DMXP_ERROR_NULL_POINTER
    );
    assert_eq!(dmxp_bytes_len(ptr::null()), 0);
    assert!(dmxp_bytes_data(ptr::null()).is_null());
    assert_eq!(dmxp_queue_count(ptr::null()), DMXP_ERROR_NULL_POINTER);
    dmxp_transport_free(ptr::null_mut());
    dmxp_bytes_free(ptr::null_mut());
}
