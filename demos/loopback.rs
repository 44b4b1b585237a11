// A frame loop against the in-process loopback boundary.
//
// RUST_LOG=trace cargo run --example loopback

use dmxp_bridge::Bridge::lifecycle::{DataFolders, Lifecycle};
use dmxp_bridge::Resources::sound::{self, NullSoundBackend, SoundManager};
use dmxp_bridge::{ByteList, LoopbackBoundary, Message, Transport};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let loopback = LoopbackBoundary::new();
    loopback.set_responder(|request| {
        let mut reply = Message::new("", request.id(), 0.0);
        reply.set_str("ack", request.type_name());
        Some(reply)
    });
    let transport = Transport::builder().build(loopback.clone())?;

    let sounds = SoundManager::new(NullSoundBackend::default());
    sounds.install(&transport);

    transport.set_handler("Display.on_render", |m, t| {
        let frame = m.get_i32("frame");
        if frame % 30 == 0 {
            let mut stats = t.create("Stats.report");
            stats.set_i32("frame", frame);
            t.post(stats);
        }
    });

    let lifecycle = Lifecycle::new().with_sounds(Arc::clone(&sounds));
    lifecycle.launch(
        &transport,
        &DataFolders {
            application_data: std::env::temp_dir().join("app"),
            user_data: std::env::temp_dir().join("user"),
            cache: std::env::temp_dir().join("cache"),
        },
    );

    // The engine asks for a sound synchronously.
    let mut create = Message::new(sound::CREATE, 1, 0.0);
    create.set_str("filepath", "music/theme.ogg").set_bool("is_music", true);
    let mut io = ByteList::from(create.as_bytes());
    if transport.dispatch_direct(&mut io) {
        let mut reply = Message::from_bytes(io.as_slice());
        println!("engine received sound handle {}", reply.get_i32("id"));
    }

    for frame in 0..90 {
        let mut render = Message::new("Display.on_render", frame as u32 + 100, 0.0);
        render.set_i32("frame", frame);
        loopback.queue_inbound(&render);
        transport.flush_cycle();
    }

    lifecycle.pause(&transport);
    lifecycle.resume(&transport);
    transport.flush_cycle();

    for arrival in loopback.arrivals() {
        let message = arrival.decode();
        println!("{message:?}");
    }
    println!("{transport:?}");
    Ok(())
}
