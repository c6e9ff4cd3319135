use super::*;
use crate::transport::{ControlEndpoint, ControlTransport};
use shared::{domain::Vocabulary, protocol::EndpointMode};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Default)]
struct RecordingTransport {
    queries: Mutex<Vec<String>>,
}

impl ControlTransport for RecordingTransport {
    fn dispatch(&self, url: Url) {
        self.queries
            .lock()
            .expect("lock")
            .push(url.query().unwrap_or_default().to_string());
    }
}

fn transmitter(vocabulary: Vocabulary) -> (CommandTransmitter, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let endpoint =
        ControlEndpoint::parse("http://127.0.0.1:3000/", EndpointMode::Bare).expect("endpoint");
    (
        CommandTransmitter::new(endpoint, vocabulary, transport.clone()),
        transport,
    )
}

#[test]
fn dom_key_codes_follow_the_binding_table() {
    let expected = [
        (87, Some(KeyAction::Hold(Command::Forward))),
        (83, Some(KeyAction::Hold(Command::Reverse))),
        (65, Some(KeyAction::Hold(Command::Left))),
        (68, Some(KeyAction::Hold(Command::Right))),
        (81, Some(KeyAction::Hold(Command::TurretLeft))),
        (69, Some(KeyAction::Hold(Command::TurretRight))),
        (90, Some(KeyAction::Hold(Command::TurretElev))),
        (32, Some(KeyAction::Hold(Command::Fire))),
        (73, Some(KeyAction::Hold(Command::Ignition))),
        (13, Some(KeyAction::StopAll)),
        (66, None),
    ];
    for (code, action) in expected {
        let key = Key::from_key_code(code).expect("mapped key code");
        assert_eq!(action_for(key), action, "key code {code}");
    }
    assert_eq!(Key::from_key_code(200), None);
}

#[test]
fn characters_are_case_insensitive() {
    assert_eq!(Key::from_char('W'), Key::Char('w'));
    assert_eq!(Key::from_char(' '), Key::Space);
    assert_eq!(Key::from_char('\r'), Key::Enter);
}

#[test]
fn key_down_and_up_hold_a_command() {
    let (mut tx, transport) = transmitter(Vocabulary::Base);
    assert_eq!(handle_key(&mut tx, Key::Char('w'), true), Ok(true));
    assert_eq!(handle_key(&mut tx, Key::Char('w'), false), Ok(true));
    assert_eq!(
        *transport.queries.lock().expect("lock"),
        vec!["10000000", "00000000"]
    );
}

#[test]
fn key_repeat_resends_state() {
    let (mut tx, transport) = transmitter(Vocabulary::Base);
    for _ in 0..3 {
        handle_key(&mut tx, Key::Space, true).expect("fire");
    }
    assert_eq!(transport.queries.lock().expect("lock").len(), 3);
}

#[test]
fn enter_stops_on_press_only() {
    let (mut tx, transport) = transmitter(Vocabulary::Extended);
    handle_key(&mut tx, Key::Char('d'), true).expect("right");
    handle_key(&mut tx, Key::Char('i'), true).expect("ignition");
    assert_eq!(handle_key(&mut tx, Key::Enter, true), Ok(true));
    assert_eq!(handle_key(&mut tx, Key::Enter, false), Ok(false));
    assert_eq!(
        *transport.queries.lock().expect("lock"),
        vec!["0001000000", "0001000010", "0000000000"]
    );
}

#[test]
fn unbound_keys_do_nothing() {
    let (mut tx, transport) = transmitter(Vocabulary::Base);
    assert_eq!(handle_key(&mut tx, Key::Char('x'), true), Ok(false));
    assert!(transport.queries.lock().expect("lock").is_empty());
}

#[test]
fn ignition_key_fails_on_base_vocabulary() {
    let (mut tx, _transport) = transmitter(Vocabulary::Base);
    assert!(handle_key(&mut tx, Key::Char('i'), true).is_err());
}
