//! Validating parsers for messages received across the frame boundary.
//!
//! Inbound data is an arbitrary JSON value controlled by whoever posted it.
//! These helpers check the discriminator against the known message types
//! before deserializing, so a declared `type` is never trusted on its own.

use serde_json::Value;

use crate::messages::{MessageKind, WidgetMessage};
use crate::ProtocolError;

/// Extracts the `type` discriminator from a raw message, if it is a string.
#[must_use]
pub fn message_type(data: &Value) -> Option<&str> {
    data.as_object()?.get("type")?.as_str()
}

/// Parses a raw JSON value into a [`WidgetMessage`].
///
/// # Errors
///
/// Returns [`ProtocolError::NotAnObject`] for non-object data,
/// [`ProtocolError::MissingType`] when the discriminator is absent or not a
/// string, [`ProtocolError::UnknownType`] for unrecognized types and
/// [`ProtocolError::InvalidPayload`] when the fields do not match the type.
pub fn parse_message(data: &Value) -> Result<WidgetMessage, ProtocolError> {
    let obj = data.as_object().ok_or(ProtocolError::NotAnObject)?;
    let declared = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    let kind: MessageKind = declared
        .parse()
        .map_err(|_| ProtocolError::UnknownType(declared.to_owned()))?;

    let message: WidgetMessage = serde_json::from_value(data.clone())
        .map_err(|source| ProtocolError::InvalidPayload { kind, source })?;
    debug_assert_eq!(message.kind(), kind);
    Ok(message)
}

/// Parses a message from its JSON text form.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if the text is not JSON, otherwise the same
/// errors as [`parse_message`].
pub fn parse_message_str(text: &str) -> Result<WidgetMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    parse_message(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PaymentSuccess;
    use serde_json::json;

    #[test]
    fn test_message_type() {
        assert_eq!(
            message_type(&json!({ "type": "paymentSuccess" })),
            Some("paymentSuccess")
        );
        assert_eq!(message_type(&json!({ "type": 7 })), None);
        assert_eq!(message_type(&json!("paymentSuccess")), None);
    }

    #[test]
    fn test_parse_payment_success() {
        let message = parse_message(&json!({
            "type": "paymentSuccess",
            "signature": "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW"
        }))
        .unwrap();
        assert!(matches!(
            message,
            WidgetMessage::PaymentSuccess(PaymentSuccess { ref signature }) if signature.starts_with("5VER")
        ));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_message(&json!(["paymentSuccess"])),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            parse_message(&Value::Null),
            Err(ProtocolError::NotAnObject)
        ));
    }

    #[test]
    fn test_parse_rejects_missing_type() {
        assert!(matches!(
            parse_message(&json!({ "signature": "abc" })),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            parse_message(&json!({ "type": true })),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = parse_message(&json!({ "type": "walletDisconnect" })).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(ref t) if t == "walletDisconnect"));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_message(&json!({
            "type": "walletConnectResult",
            "walletName": "Phantom",
            "success": "yes"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidPayload {
                kind: MessageKind::WalletConnectResult,
                ..
            }
        ));

        let err = parse_message(&json!({ "type": "paymentSuccess" })).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { .. }));
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let message = parse_message(&json!({
            "type": "paymentError",
            "error": "Insufficient funds",
            "code": 4001
        }))
        .unwrap();
        assert_eq!(message.kind(), MessageKind::PaymentError);
    }

    #[test]
    fn test_parse_message_str() {
        assert!(matches!(
            parse_message_str("not json"),
            Err(ProtocolError::Json(_))
        ));
        let message = parse_message_str(r#"{"type":"paymentError"}"#).unwrap();
        assert_eq!(message.kind(), MessageKind::PaymentError);
    }
}
