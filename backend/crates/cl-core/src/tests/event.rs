use crate::{event, message_type, typed};

#[test]
fn given_receive_text_when_inspected_then_type_and_text_present() {
    // Given
    let message = event::receive_text("hello");

    // Then
    assert_eq!(message_type(&message), Some(event::RECEIVE));
    assert_eq!(event::text(&message), Some("hello"));
    assert!(event::bytes(&message).is_none());
}

#[test]
fn given_binary_payload_when_round_tripped_through_message_then_bytes_preserved() {
    // Given
    let payload = vec![0_u8, 1, 2, 254, 255];

    // When
    let message = event::receive_bytes(&payload);

    // Then
    assert_eq!(event::bytes(&message), Some(payload));
    assert!(event::text(&message).is_none());
}

#[test]
fn given_close_without_code_when_inspected_then_no_code_key() {
    // When
    let message = event::close(None, None);

    // Then
    assert_eq!(message_type(&message), Some(event::CLOSE));
    assert!(event::code(&message).is_none());
    assert_eq!(message.len(), 1);
}

#[test]
fn given_close_with_code_and_reason_when_inspected_then_both_readable() {
    // When
    let message = event::close(Some(crate::close_code::SERVER_ERROR), Some("boom"));

    // Then
    assert_eq!(event::code(&message), Some(1011));
    assert_eq!(event::reason(&message), Some("boom"));
}

#[test]
fn given_accept_with_subprotocol_when_inspected_then_subprotocol_readable() {
    let message = event::accept(Some("graphql-ws"));

    assert_eq!(event::subprotocol(&message), Some("graphql-ws"));
}

#[test]
fn given_non_string_type_when_message_type_then_none() {
    // Given
    let mut message = typed("placeholder");
    message.insert("type".into(), serde_json::Value::from(42));

    // Then
    assert!(message_type(&message).is_none());
}
