// Sound requests arriving as synchronous engine messages.

use dmxp_bridge::Bridge::{Disconnected, Transport};
use dmxp_bridge::Resources::sound::{self, NullSoundBackend, SoundManager};
use dmxp_bridge::{ByteList, Message};
use std::sync::Arc;

fn setup(backend: NullSoundBackend) -> (Transport, Arc<SoundManager>) {
    let transport = Transport::builder().build(Disconnected).expect("valid");
    let manager = SoundManager::new(backend);
    manager.install(&transport);
    (transport, manager)
}

/// Runs one direct request and decodes the reply, if any.
fn request(transport: &Transport, message: Message) -> Option<Message> {
    let mut io = ByteList::from(message.as_bytes());
    transport
        .dispatch_direct(&mut io)
        .then(|| Message::from_bytes(io.as_slice()))
}

fn create(transport: &Transport, path: &str, is_music: bool) -> u32 {
    let mut m = Message::new(sound::CREATE, 1, 0.0);
    m.set_str("filepath", path).set_bool("is_music", is_music);
    let mut reply = request(transport, m).expect("create always replies");
    reply.get_i32("id") as u32
}

fn with_id(type_name: &str, id: u32) -> Message {
    let mut m = Message::new(type_name, 2, 0.0);
    m.set_i32("id", id as i32);
    m
}

#[test]
fn create_play_query_unload() {
    let (transport, manager) = setup(NullSoundBackend {
        duration: 3.25,
        async_effects: false,
    });

    let music = create(&transport, "theme.ogg", true);
    let effect = create(&transport, "click.wav", false);
    assert_ne!(music, effect);
    assert_eq!(manager.len(), 2);

    let mut reply = request(&transport, with_id(sound::DURATION, music)).expect("known handle");
    assert_eq!(reply.get_f64("duration"), 3.25);

    let mut play = with_id(sound::PLAY, music);
    play.set_bool("is_repeating", true);
    assert!(request(&transport, play).is_none());

    let mut reply = request(&transport, with_id(sound::IS_PLAYING, music)).expect("known handle");
    assert!(reply.get_bool("is_playing"));

    let mut seek = with_id(sound::SET_POSITION, music);
    seek.set_f64("position", 1.5);
    request(&transport, seek);
    let mut reply = request(&transport, with_id(sound::POSITION, music)).expect("known handle");
    assert_eq!(reply.get_f64("position"), 1.5);

    let mut volume = with_id(sound::SET_VOLUME, music);
    volume.set_f64("volume", 0.25);
    request(&transport, volume);
    assert_eq!(manager.sound(music).map(|s| s.state().volume), Some(0.25));

    request(&transport, with_id(sound::PAUSE, music));
    let mut reply = request(&transport, with_id(sound::IS_PLAYING, music)).expect("known handle");
    assert!(!reply.get_bool("is_playing"));

    request(&transport, with_id(sound::UNLOAD, music));
    assert_eq!(manager.len(), 1);
    assert!(manager.sound(effect).is_some());
}

#[test]
fn stale_handles_get_no_reply() {
    let (transport, _manager) = setup(NullSoundBackend::default());
    let id = create(&transport, "gone.wav", false);
    request(&transport, with_id(sound::UNLOAD, id));

    assert!(request(&transport, with_id(sound::DURATION, id)).is_none());
    assert!(request(&transport, with_id(sound::IS_PLAYING, id)).is_none());
    assert!(request(&transport, with_id(sound::POSITION, id)).is_none());
    assert!(request(&transport, with_id(sound::DURATION, 0)).is_none());

    // the freed handle is the next one issued
    assert_eq!(create(&transport, "next.wav", false), id);
}

#[test]
fn is_loading_tracks_pending_effects() {
    let (transport, manager) = setup(NullSoundBackend {
        duration: 1.0,
        async_effects: true,
    });

    let loading = |transport: &Transport| {
        let mut reply = request(transport, Message::new(sound::IS_LOADING, 3, 0.0))
            .expect("is_loading always replies");
        reply.get_bool("is_loading")
    };

    assert!(!loading(&transport));
    let effect = create(&transport, "boom.wav", false);
    assert!(loading(&transport));
    manager.on_load_finished(effect, true, 0.5);
    assert!(!loading(&transport));
}

#[test]
fn uninstall_removes_every_handler() {
    let (transport, manager) = setup(NullSoundBackend::default());
    for type_name in sound::MESSAGE_TYPES {
        assert!(transport.has_handler(type_name), "{type_name}");
    }
    manager.uninstall(&transport);
    for type_name in sound::MESSAGE_TYPES {
        assert!(!transport.has_handler(type_name), "{type_name}");
    }
}
