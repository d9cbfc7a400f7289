use crate::{ConsumerContext, Flow, HandlerFuture, HandlerTable, WsError, handler_name};

use cl_core::{Message, typed};

#[derive(Default)]
struct Counter {
    pings: usize,
}

fn ping<'a>(
    consumer: &'a mut Counter,
    _context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        consumer.pings += 1;
        Ok(Flow::Continue)
    })
}

fn stop<'a>(
    _consumer: &'a mut Counter,
    _context: &'a ConsumerContext,
    _message: Message,
) -> HandlerFuture<'a> {
    Box::pin(async move { Ok(Flow::Stop) })
}

#[test]
fn given_dotted_type_when_handler_name_then_dots_replaced() {
    assert_eq!(handler_name("chat.message").ok(), Some("chat_message".to_string()));
    assert_eq!(
        handler_name("websocket.receive").ok(),
        Some("websocket_receive".to_string())
    );
}

#[test]
fn given_private_type_when_handler_name_then_malformed() {
    // When
    let result = handler_name("_private.thing");

    // Then
    assert!(matches!(result, Err(WsError::MalformedType { .. })));
}

#[test]
fn given_type_with_leading_dot_when_handler_name_then_malformed() {
    // ".x" becomes "_x" after substitution
    assert!(matches!(
        handler_name(".hidden"),
        Err(WsError::MalformedType { .. })
    ));
}

#[test]
fn given_registered_handler_when_resolved_then_found() {
    // Given
    let table = HandlerTable::<Counter>::new()
        .on("test.ping", ping)
        .and_then(|table| table.on("test.stop", stop));

    // Then
    let table = match table {
        Ok(table) => table,
        Err(e) => panic!("registration failed: {e}"),
    };
    assert_eq!(table.len(), 2);
    assert!(table.resolve(&typed("test.ping")).is_ok());
    assert!(table.handles("test.stop"));
}

#[test]
fn given_unbound_type_when_resolved_then_unknown_handler() {
    // Given
    let table = HandlerTable::<Counter>::new();

    // When
    let result = table.resolve(&typed("test.nothing"));

    // Then
    assert!(matches!(result, Err(WsError::UnknownHandler { message_type, .. }) if message_type == "test.nothing"));
}

#[test]
fn given_message_without_type_when_resolved_then_malformed() {
    // Given
    let table = HandlerTable::<Counter>::new();

    // When
    let result = table.resolve(&Message::new());

    // Then
    assert!(matches!(
        result,
        Err(WsError::MalformedType {
            message_type: None,
            ..
        })
    ));
}

#[test]
fn given_private_name_when_registered_then_rejected() {
    let result = HandlerTable::<Counter>::new().on("_internal", ping);

    assert!(result.is_err());
}

#[test]
fn given_two_types_with_same_handler_name_when_registered_then_later_wins() {
    // Given: "a.b" and "a_b" share the handler name "a_b"
    let table = HandlerTable::<Counter>::new()
        .on("a.b", ping)
        .and_then(|table| table.on("a_b", stop));

    // Then
    let table = match table {
        Ok(table) => table,
        Err(e) => panic!("registration failed: {e}"),
    };
    assert_eq!(table.len(), 1);
    assert!(table.handles("a.b"));
}
