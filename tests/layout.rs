// Layout conformance tests for the C-visible structs and the wire header.
// They print the observed values to aid debugging when a mismatch occurs on a
// given platform.
use dmxp_bridge::ffi::DmxpBoundaryCallbacks;
use dmxp_bridge::Message;
use memoffset::offset_of;
use std::mem::{align_of, size_of};

#[test]
fn test_boundary_callbacks_layout() {
    let ptr_size = size_of::<*mut u8>();
    let size = size_of::<DmxpBoundaryCallbacks>();
    let align = align_of::<DmxpBoundaryCallbacks>();
    let off_user = offset_of!(DmxpBoundaryCallbacks, user);
    let off_send = offset_of!(DmxpBoundaryCallbacks, send_message);
    let off_post = offset_of!(DmxpBoundaryCallbacks, post_messages);

    println!(
        "DmxpBoundaryCallbacks => size: {size}, align: {align}, offsets: [user:{off_user}, send_message:{off_send}, post_messages:{off_post}]"
    );

    // Option<extern "C" fn> is a nullable function pointer
    assert_eq!(size, 3 * ptr_size);
    assert_eq!(align, align_of::<*mut u8>());
    assert_eq!(off_user, 0);
    assert_eq!(off_send, ptr_size);
    assert_eq!(off_post, 2 * ptr_size);
}

#[test]
fn test_message_header_layout() {
    let m = Message::new("Ping", 7, 12.5);
    let bytes = m.as_bytes();
    println!("header => {}", m.hex_dump());

    // type_len:u32 "Ping" id:i32 timestamp:f64
    assert_eq!(bytes.len(), 4 + 4 + 4 + 8);
    assert_eq!(&bytes[0..4], &[0, 0, 0, 4]);
    assert_eq!(&bytes[4..8], b"Ping");
    assert_eq!(&bytes[8..12], &[0, 0, 0, 7]);
    assert_eq!(&bytes[12..20], &12.5f64.to_bits().to_be_bytes());
}
