use serde_json::json;

use super::*;

fn packet(id: &str) -> ResultHandoffPacket {
    ResultHandoffPacket::new(
        ProfileId::from(id),
        CalculationResult(json!({"recommended_regime": "new", "savings_amount": 12500.0})),
    )
}

#[test]
fn packet_is_consumed_exactly_once() {
    let (publisher, mut receiver) = transition();
    publisher.publish(packet("p-1")).expect("publish");

    let first = receiver.consume().expect("packet");
    assert_eq!(first.profile_id.as_str(), "p-1");
    assert_eq!(first.result.recommended_regime(), Some("new"));
    assert_eq!(receiver.consume(), None);
}

#[test]
fn empty_receiver_has_nothing() {
    let mut receiver = HandoffReceiver::empty();
    assert_eq!(receiver.consume(), None);
}

#[test]
fn consuming_before_publish_closes_the_channel() {
    let (publisher, mut receiver) = transition();
    assert_eq!(receiver.consume(), None);
    assert!(publisher.is_closed());
    let returned = publisher.publish(packet("p-2")).expect_err("receiver gone");
    assert_eq!(returned.profile_id.as_str(), "p-2");
}

#[test]
fn dropped_receiver_returns_the_packet() {
    let (publisher, receiver) = transition();
    drop(receiver);
    assert!(publisher.publish(packet("p-3")).is_err());
}
