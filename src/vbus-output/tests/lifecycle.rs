use serde::Deserialize;
use vbus_core::{AudioOutput, Config, SampleFormat, DEFAULT_BUS_URL, VBUS_URL_ENV};
use vbus_output::{MemoryBus, VbusOutput};

const URL: &str = "nats://vbus.test:4222";

#[derive(Debug, Deserialize)]
struct StartPayload {
    rate: i32,
    format: i32,
}

fn connected_output(bus: &MemoryBus) -> VbusOutput {
    let mut output = VbusOutput::with_connector(Config::default(), bus.clone())
        .expect("runtime should build")
        .with_url(URL);
    output.init(&[]).expect("init never fails on bus errors");
    output
}

#[test]
fn init_announces_element_first() {
    let bus = MemoryBus::new();
    let output = connected_output(&bus);

    assert!(output.is_connected());
    assert_eq!(bus.connection_attempts(), vec![URL.to_string()]);

    let messages = bus.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "system.db.newElement");

    let element: serde_json::Value = serde_json::from_slice(&messages[0].payload).unwrap();
    assert_eq!(element["path"], "system.audio.shairport-sync");
    assert_eq!(element["name"], "shairport-sync");
    assert_eq!(element["uuid"], "shairport-sync");
    assert_eq!(element["tags"], serde_json::json!(["audio", "source", "airplay"]));
    let methods: Vec<&str> = element["publish"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["methode"].as_str().unwrap())
        .collect();
    assert_eq!(methods, vec!["start", "play", "stop"]);
}

#[test]
fn init_returns_backend_settings() {
    let mut config = Config::default();
    config.audio.latency_offset = 0.25;
    let mut output = VbusOutput::with_connector(config, MemoryBus::new())
        .unwrap()
        .with_url(URL);

    let settings = output.init(&["--ignored".to_string()]).unwrap();
    assert_eq!(settings.buffer_desired_length, 1.0);
    assert_eq!(settings.latency_offset, 0.25);
}

#[test]
fn session_publishes_each_event_once() {
    let bus = MemoryBus::new();
    let mut output = connected_output(&bus);
    let topics = output.topics().clone();

    output.start(44100, SampleFormat::S16);
    let pcm: Vec<u8> = (0..=255u8).cycle().take(352 * 4).collect();
    output.play(&pcm, 352);
    output.play(&pcm[..8], 2);
    output.stop();
    output.deinit();

    let start = bus.messages_on(&topics.start);
    assert_eq!(start.len(), 1);
    let payload: StartPayload = serde_json::from_slice(&start[0].payload).unwrap();
    assert_eq!(payload.rate, 44100);
    assert_eq!(payload.format, 3);

    let play = bus.messages_on(&topics.play);
    assert_eq!(play.len(), 2);
    assert_eq!(play[0].payload.as_ref(), pcm.as_slice());
    assert_eq!(play[1].payload.as_ref(), &pcm[..8]);

    let stop = bus.messages_on(&topics.stop);
    assert_eq!(stop.len(), 1);
    assert!(stop[0].payload.is_empty());

    let subjects: Vec<String> = bus.messages().into_iter().map(|m| m.subject).collect();
    assert_eq!(
        subjects,
        vec![
            "system.db.newElement",
            "system.audio.shairport-sync.start",
            "system.audio.shairport-sync.play",
            "system.audio.shairport-sync.play",
            "system.audio.shairport-sync.stop",
        ]
    );
}

#[test]
fn unknown_format_code_passes_through() {
    let bus = MemoryBus::new();
    let mut output = connected_output(&bus);

    output.start(48000, SampleFormat::from_code(99));

    let start = bus.messages_on("system.audio.shairport-sync.start");
    let payload: StartPayload = serde_json::from_slice(&start[0].payload).unwrap();
    assert_eq!(payload.rate, 48000);
    assert_eq!(payload.format, 99);
}

#[test]
fn unreachable_bus_still_initialises_and_drops_events() {
    let bus = MemoryBus::unreachable();
    let mut output = VbusOutput::with_connector(Config::default(), bus.clone())
        .unwrap()
        .with_url(URL);

    assert!(output.init(&[]).is_ok());
    assert!(!output.is_connected());

    output.start(44100, SampleFormat::S16);
    output.play(&[0u8; 16], 4);
    output.stop();
    output.deinit();

    assert_eq!(bus.connection_attempts(), vec![URL.to_string()]);
    assert!(bus.messages().is_empty());
    assert_eq!(bus.flushes(), 0);
}

#[test]
fn deinit_flushes_and_keeps_connection() {
    let bus = MemoryBus::new();
    let mut output = connected_output(&bus);

    output.start(44100, SampleFormat::S16);
    output.stop();
    assert_eq!(bus.flushes(), 0);

    output.deinit();
    assert_eq!(bus.flushes(), 1);
    assert!(output.is_connected());

    output.start(48000, SampleFormat::S16);
    output.stop();
    assert_eq!(bus.messages_on("system.audio.shairport-sync.start").len(), 2);
    assert_eq!(bus.messages_on("system.audio.shairport-sync.stop").len(), 2);
    assert_eq!(bus.connection_attempts().len(), 1);
    assert_eq!(bus.flushes(), 1);
}

#[test]
fn custom_element_path_moves_event_subjects() {
    let mut config = Config::default();
    config.element.path = "system.audio.kitchen".into();
    config.bus.registration_subject = "system.db.register".into();
    let bus = MemoryBus::new();
    let mut output = VbusOutput::with_connector(config, bus.clone())
        .unwrap()
        .with_url(URL);
    output.init(&[]).unwrap();
    output.stop();

    let subjects: Vec<String> = bus.messages().into_iter().map(|m| m.subject).collect();
    assert_eq!(subjects, vec!["system.db.register", "system.audio.kitchen.stop"]);
}

// Only test in this binary that touches the process environment.
#[test]
fn bus_url_comes_from_environment() {
    std::env::set_var(VBUS_URL_ENV, "nats://from-env:4222");
    let bus = MemoryBus::new();
    let mut output = VbusOutput::with_connector(Config::default(), bus.clone()).unwrap();
    output.init(&[]).unwrap();
    assert_eq!(
        bus.connection_attempts(),
        vec!["nats://from-env:4222".to_string()]
    );

    std::env::remove_var(VBUS_URL_ENV);
    let bus = MemoryBus::new();
    let mut output = VbusOutput::with_connector(Config::default(), bus.clone()).unwrap();
    output.init(&[]).unwrap();
    assert_eq!(bus.connection_attempts(), vec![DEFAULT_BUS_URL.to_string()]);
    assert!(output.is_connected());
    assert_eq!(bus.messages_on("system.db.newElement").len(), 1);
}
