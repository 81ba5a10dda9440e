//! End-to-end sessions over a mock link.
//!
//! These tests play the device side by hand: they inject literal wire
//! bytes into a [`MockTransport`], drive the node through its public API
//! and check the exact frames it answers with.

use setu_link::clock::ManualClock;
use setu_link::messages::{ParamResponse, TimeStamp, TopicInfo, WireMessage};
use setu_link::node::Node;
use setu_link::protocol::{
    ErrorCounters, FrameBuffer, FrameParser, CONNECTION_TIMEOUT_MS, DYNAMIC_ID_BASE,
    MAX_SUBSCRIBERS, TOPIC_PARAMETER_REQUEST, TOPIC_PUBLISHERS, TOPIC_SUBSCRIBERS, TOPIC_TIME,
};
use setu_link::transport::MockTransport;
use setu_link::{Error, LinkState};
use std::sync::{Arc, Mutex};

/// `FF FF 00 00 00 00 FF` - negotiation trigger with an empty payload.
const NEGOTIATION_REQUEST: [u8; 7] = [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF];

fn bridge() -> (Node, MockTransport, ManualClock) {
    let link = MockTransport::new();
    let clock = ManualClock::new();
    let node = Node::new(Box::new(link.clone()), Box::new(clock.clone()));
    (node, link, clock)
}

fn device_frame(topic_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = FrameBuffer::new();
    frame.set_frame(topic_id, payload).unwrap();
    frame.as_bytes().to_vec()
}

fn device_message<M: WireMessage>(topic_id: u16, message: &M) -> Vec<u8> {
    let mut buf = [0u8; 512];
    let len = message.encode(&mut buf).unwrap();
    device_frame(topic_id, &buf[..len])
}

/// Split the node's outbound byte stream back into (topic, payload) pairs.
fn captured_frames(link: &MockTransport) -> Vec<(u16, Vec<u8>)> {
    let mut parser = FrameParser::new();
    let mut counters = ErrorCounters::default();
    link.get_written()
        .iter()
        .filter_map(|&b| parser.push(b, &mut counters))
        .map(|f| (f.topic_id(), f.payload().to_vec()))
        .collect()
}

#[test]
fn negotiation_announces_all_registered_topics() {
    let (mut node, link, _clock) = bridge();

    let chatter = node.advertise("chatter", "std_msgs/String").unwrap();
    assert_eq!(chatter.id() as usize, DYNAMIC_ID_BASE as usize + MAX_SUBSCRIBERS);
    let cmd_vel = node
        .subscribe("cmd_vel", "geometry_msgs/Twist", |_| true)
        .unwrap();
    assert_eq!(cmd_vel, DYNAMIC_ID_BASE);

    link.inject_read(&NEGOTIATION_REQUEST);
    node.spin().unwrap();

    let frames = captured_frames(&link);
    assert_eq!(frames.len(), 3);

    // Time probe first, then publishers, then subscribers.
    assert_eq!(frames[0].0, TOPIC_TIME);
    assert_eq!(frames[0].1, vec![0u8; 8]);

    assert_eq!(frames[1].0, TOPIC_PUBLISHERS);
    let info = TopicInfo::decode(&frames[1].1).unwrap();
    assert_eq!(
        info,
        TopicInfo {
            topic_id: 125,
            topic_name: "chatter".to_string(),
            message_type: "std_msgs/String".to_string(),
        }
    );

    assert_eq!(frames[2].0, TOPIC_SUBSCRIBERS);
    let info = TopicInfo::decode(&frames[2].1).unwrap();
    assert_eq!(info.topic_id, DYNAMIC_ID_BASE);
    assert_eq!(info.topic_name, "cmd_vel");
}

#[test]
fn full_session_reaches_connected_and_synced_time() {
    let (mut node, link, clock) = bridge();

    assert_eq!(node.link_state(), LinkState::Disconnected);

    clock.advance(2_000);
    link.inject_read(&NEGOTIATION_REQUEST);
    node.spin().unwrap();
    assert!(matches!(node.link_state(), LinkState::Syncing { .. }));

    // Device answers after a simulated 20ms round trip, clock at 1000s.
    clock.advance(20);
    link.inject_read(&device_message(TOPIC_TIME, &TimeStamp::new(1_000, 0)));
    node.spin().unwrap();

    assert!(node.connected());
    // Half the round trip is credited to the reported device time.
    assert_eq!(node.now(), TimeStamp::new(1_000, 10_000_000));

    clock.advance(500);
    assert_eq!(node.now(), TimeStamp::new(1_000, 510_000_000));
}

#[test]
fn subscriber_sees_exactly_the_published_payload() {
    let (mut node, link, _clock) = bridge();

    let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    node.subscribe("bumper", "std_msgs/ByteMultiArray", move |payload| {
        sink.lock().unwrap().push(payload.to_vec());
        true
    })
    .unwrap();

    link.inject_read(&device_frame(DYNAMIC_ID_BASE, &[0x01, 0x02, 0x03]));
    node.spin().unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &[vec![0x01, 0x02, 0x03]]);
    assert_eq!(node.counters(), ErrorCounters::default());
}

#[test]
fn corrupted_frames_are_dropped_but_the_link_recovers() {
    let (mut node, link, _clock) = bridge();

    let count: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    node.subscribe("bumper", "std_msgs/ByteMultiArray", move |_| {
        *sink.lock().unwrap() += 1;
        true
    })
    .unwrap();

    // Noise, then an oversize claim, then a poisoned checksum, then a
    // valid frame. Only the last one may reach the handler.
    link.inject_read(&[0x13, 0x37, 0xFF, 0x00]);
    link.inject_read(&[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF]);
    let mut poisoned = device_frame(DYNAMIC_ID_BASE, &[9, 9]);
    let last = poisoned.len() - 1;
    poisoned[last] = poisoned[last].wrapping_add(1);
    link.inject_read(&poisoned);
    link.inject_read(&device_frame(DYNAMIC_ID_BASE, &[0x42]));

    while node.spin().unwrap() > 0 {}

    assert_eq!(*count.lock().unwrap(), 1);
    let counters = node.counters();
    assert_eq!(counters.invalid_size, 1);
    assert!(counters.state > 0);
    assert_eq!(counters.malformed_message, 0);
}

#[test]
fn connection_lifecycle_survives_a_dropout() {
    let (mut node, link, clock) = bridge();

    // Handshake.
    link.inject_read(&NEGOTIATION_REQUEST);
    node.spin().unwrap();
    clock.advance(10);
    link.inject_read(&device_message(TOPIC_TIME, &TimeStamp::new(100, 0)));
    node.spin().unwrap();
    assert!(node.connected());

    // Device goes quiet past the timeout.
    clock.advance(CONNECTION_TIMEOUT_MS + 1);
    node.spin().unwrap();
    assert!(!node.connected());
    assert_eq!(node.link_state(), LinkState::Disconnected);

    // Device comes back and renegotiates.
    link.inject_read(&NEGOTIATION_REQUEST);
    node.spin().unwrap();
    clock.advance(6);
    link.inject_read(&device_message(TOPIC_TIME, &TimeStamp::new(140, 0)));
    node.spin().unwrap();

    assert!(node.connected());
    assert_eq!(node.now(), TimeStamp::new(140, 3_000_000));
}

#[test]
fn parameter_lookup_round_trip() {
    let (mut node, link, _clock) = bridge();

    let answer = ParamResponse::new(vec![250], vec![0.033], vec![]);
    link.inject_read(&device_message(TOPIC_PARAMETER_REQUEST, &answer));

    let response = node.get_param("/ticks_per_rev", 100).unwrap();
    assert_eq!(response.ints(1), Some([250].as_slice()));
    assert_eq!(response.floats(1).map(|f| f.len()), Some(1));
    // Shape mismatch returns nothing; the response was already consumed.
    assert_eq!(response.strings(2), None);

    let frames = captured_frames(&link);
    assert_eq!(frames[0].0, TOPIC_PARAMETER_REQUEST);
}

#[test]
fn closed_link_ends_the_spin_loop() {
    let (mut node, link, _clock) = bridge();

    link.inject_read(&device_frame(DYNAMIC_ID_BASE, &[1]));
    link.close();

    // Buffered bytes still drain before the close is observed.
    assert!(node.spin().unwrap() > 0);
    assert!(matches!(node.spin(), Err(Error::LinkClosed)));
}
