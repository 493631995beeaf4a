//! Origin-checked message channel to the parent frame.
//!
//! Inbound events are accepted only when they come from the parent window
//! and carry the trusted origin. The trusted origin is the one pinned in
//! [`ChannelConfig`], else the one resolved at mount. A `srcDoc` frame with
//! neither may trust the first valid message from an `http(s)` origin, after
//! which that origin is locked in.
//!
//! Outbound messages go to the trusted origin. Only in the `srcDoc` case
//! without a pinned or locked origin does the channel fall back to `"*"`.

use paylink_proto::{Direction, WidgetMessage, parse_message};
use serde_json::Value;

use crate::config::ChannelConfig;
use crate::error::{ProtocolViolation, SendError};
use crate::origin::{FrameEnvironment, Origin, is_srcdoc, resolve_parent_origin};

/// Wildcard `postMessage` target.
pub const ANY_ORIGIN: &str = "*";

/// Error returned by a [`MessagePort`] that could not post.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("postMessage failed: {0}")]
pub struct PortError(pub String);

/// Outbound side of `window.parent.postMessage`.
pub trait MessagePort {
    /// Posts `message` to the parent with the given target origin.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] if the platform rejects the message.
    fn post(&self, message: &Value, target_origin: &str) -> Result<(), PortError>;
}

impl<T: MessagePort + ?Sized> MessagePort for &T {
    fn post(&self, message: &Value, target_origin: &str) -> Result<(), PortError> {
        (**self).post(message, target_origin)
    }
}

/// A `message` event as delivered to the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// `event.origin`.
    pub origin: String,
    /// Whether `event.source` is `window.parent`.
    pub from_parent: bool,
    /// `event.data`, untrusted.
    pub data: Value,
}

impl InboundEvent {
    /// An event posted by the parent window.
    #[must_use]
    pub fn from_parent(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            from_parent: true,
            data,
        }
    }
}

/// Typed, origin-checked wrapper around a [`MessagePort`].
#[derive(Debug)]
pub struct MessageChannel<P> {
    port: P,
    locked: Option<String>,
    srcdoc: bool,
    pinned: bool,
    #[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
    debug: bool,
}

impl<P: MessagePort> MessageChannel<P> {
    /// Creates a channel, resolving the parent origin from `env`.
    pub fn new<E: FrameEnvironment + ?Sized>(port: P, env: &E, config: &ChannelConfig) -> Self {
        let pinned = config
            .expected_origin
            .as_ref()
            .filter(|o| !o.is_null())
            .map(|o| o.as_str().to_owned());
        let srcdoc = is_srcdoc(env);
        let locked = pinned.clone().or_else(|| match resolve_parent_origin(env) {
            Some(Origin::Tuple(origin)) => Some(origin),
            Some(Origin::Null) | None => None,
        });

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            parent_origin = locked.as_deref().unwrap_or("<unresolved>"),
            srcdoc,
            pinned = pinned.is_some(),
            "message channel created"
        );

        Self {
            port,
            locked,
            srcdoc,
            pinned: pinned.is_some(),
            debug: config.debug,
        }
    }

    /// Validates an inbound event and returns the parsed message.
    ///
    /// On the first valid message in `srcDoc` mode the sender's origin is
    /// locked in.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] for anything that must be dropped.
    pub fn accept(&mut self, event: &InboundEvent) -> Result<WidgetMessage, ProtocolViolation> {
        let result = self.check(event);
        #[cfg(feature = "telemetry")]
        if self.debug
            && let Err(violation) = &result
        {
            tracing::debug!(origin = %event.origin, %violation, "dropped inbound message");
        }
        result
    }

    fn check(&mut self, event: &InboundEvent) -> Result<WidgetMessage, ProtocolViolation> {
        if !event.from_parent {
            return Err(ProtocolViolation::WrongSource);
        }

        let adopt = match &self.locked {
            Some(expected) if *expected == event.origin => None,
            Some(expected) => {
                return Err(ProtocolViolation::OriginMismatch {
                    expected: expected.clone(),
                    actual: event.origin.clone(),
                });
            }
            None if !self.may_infer_origin() => {
                return Err(ProtocolViolation::NoTrustedOrigin(event.origin.clone()));
            }
            None => match Origin::parse_candidate(&event.origin) {
                Some(Origin::Tuple(origin)) if origin == event.origin => Some(origin),
                _ => return Err(ProtocolViolation::UntrustedOrigin(event.origin.clone())),
            },
        };

        let message = parse_message(&event.data)?;
        if message.direction() != Direction::ParentToChild {
            return Err(ProtocolViolation::UnexpectedDirection(message.kind()));
        }

        if let Some(origin) = adopt {
            #[cfg(feature = "telemetry")]
            tracing::info!(%origin, "locked in parent origin from first message");
            self.locked = Some(origin);
        }
        Ok(message)
    }

    /// Sends a child-to-parent message.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::WrongDirection`] for parent-only messages,
    /// [`SendError::NoTargetOrigin`] when there is nobody to trust, or the
    /// port's failure.
    pub fn send(&self, message: &WidgetMessage) -> Result<(), SendError> {
        if message.direction() != Direction::ChildToParent {
            return Err(SendError::WrongDirection(message.kind()));
        }
        let target = self.target_origin().ok_or(SendError::NoTargetOrigin)?;
        let value = serde_json::to_value(message)?;
        self.port.post(&value, target)?;
        Ok(())
    }

    /// The trusted parent origin, if any.
    #[must_use]
    pub fn locked_origin(&self) -> Option<&str> {
        self.locked.as_deref()
    }

    /// Origin outbound messages are addressed to.
    #[must_use]
    pub fn target_origin(&self) -> Option<&str> {
        match &self.locked {
            Some(origin) => Some(origin),
            None if self.may_infer_origin() => Some(ANY_ORIGIN),
            None => None,
        }
    }

    /// Whether a message could be sent right now.
    #[must_use]
    pub fn has_trust_context(&self) -> bool {
        self.target_origin().is_some()
    }

    /// Whether the frame runs in `srcDoc` mode.
    #[must_use]
    pub const fn is_srcdoc(&self) -> bool {
        self.srcdoc
    }

    /// The underlying port.
    #[must_use]
    pub const fn port(&self) -> &P {
        &self.port
    }

    const fn may_infer_origin(&self) -> bool {
        self.srcdoc && !self.pinned
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::origin::StaticFrame;
    use paylink_proto::{MessageKind, WalletConnect};
    use rust_decimal::Decimal;
    use serde_json::json;

    /// Port that records what was posted.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPort {
        pub(crate) sent: Mutex<Vec<(Value, String)>>,
    }

    impl RecordingPort {
        pub(crate) fn sent(&self) -> Vec<(Value, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessagePort for RecordingPort {
        fn post(&self, message: &Value, target_origin: &str) -> Result<(), PortError> {
            self.sent
                .lock()
                .unwrap()
                .push((message.clone(), target_origin.to_owned()));
            Ok(())
        }
    }

    fn success(signature: &str) -> Value {
        json!({ "type": "paymentSuccess", "signature": signature })
    }

    fn connect_message() -> WidgetMessage {
        WidgetMessage::WalletConnect(WalletConnect {
            wallet_name: "Phantom".into(),
            amount: Decimal::ONE,
            currency: "USDC".into(),
            request_id: None,
        })
    }

    fn hosted() -> StaticFrame {
        StaticFrame::new("https://widget.example").with_referrer("https://shop.example/checkout")
    }

    fn open(env: &StaticFrame) -> MessageChannel<RecordingPort> {
        MessageChannel::new(RecordingPort::default(), env, &ChannelConfig::default())
    }

    #[test]
    fn test_accepts_resolved_origin() {
        let mut channel = open(&hosted());
        assert_eq!(channel.locked_origin(), Some("https://shop.example"));
        let message = channel
            .accept(&InboundEvent::from_parent("https://shop.example", success("sig")))
            .unwrap();
        assert_eq!(message.kind(), MessageKind::PaymentSuccess);
    }

    #[test]
    fn test_rejects_wrong_origin_and_source() {
        let mut channel = open(&hosted());
        let err = channel
            .accept(&InboundEvent::from_parent("https://evil.example", success("sig")))
            .unwrap_err();
        assert!(matches!(err, ProtocolViolation::OriginMismatch { .. }));

        let event = InboundEvent {
            origin: "https://shop.example".into(),
            from_parent: false,
            data: success("sig"),
        };
        assert!(matches!(
            channel.accept(&event),
            Err(ProtocolViolation::WrongSource)
        ));
    }

    #[test]
    fn test_rejects_malformed_and_child_messages() {
        let mut channel = open(&hosted());
        let origin = "https://shop.example";
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent(origin, json!({ "type": "walletList" }))),
            Err(ProtocolViolation::Malformed(_))
        ));
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent(origin, json!("paymentSuccess"))),
            Err(ProtocolViolation::Malformed(_))
        ));
        let echoed = serde_json::to_value(connect_message()).unwrap();
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent(origin, echoed)),
            Err(ProtocolViolation::UnexpectedDirection(MessageKind::WalletConnect))
        ));
    }

    #[test]
    fn test_unresolved_non_srcdoc_rejects_everything() {
        let env = StaticFrame::new("https://widget.example");
        let mut channel = open(&env);
        assert!(!channel.has_trust_context());
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://shop.example", success("sig"))),
            Err(ProtocolViolation::NoTrustedOrigin(_))
        ));
        assert!(matches!(
            channel.send(&connect_message()),
            Err(SendError::NoTargetOrigin)
        ));
    }

    #[test]
    fn test_srcdoc_locks_first_valid_origin() {
        let mut channel = open(&StaticFrame::srcdoc());
        assert_eq!(channel.locked_origin(), None);
        assert_eq!(channel.target_origin(), Some(ANY_ORIGIN));

        // "null" and malformed first messages do not lock anything in.
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("null", success("sig"))),
            Err(ProtocolViolation::UntrustedOrigin(_))
        ));
        assert!(channel
            .accept(&InboundEvent::from_parent("https://shop.example", json!({ "type": "walletList" })))
            .is_err());
        assert_eq!(channel.locked_origin(), None);

        channel
            .accept(&InboundEvent::from_parent("https://shop.example", success("sig")))
            .unwrap();
        assert_eq!(channel.locked_origin(), Some("https://shop.example"));
        assert_eq!(channel.target_origin(), Some("https://shop.example"));

        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://evil.example", success("sig"))),
            Err(ProtocolViolation::OriginMismatch { .. })
        ));
    }

    #[test]
    fn test_srcdoc_rejects_non_normalized_origin() {
        let mut channel = open(&StaticFrame::srcdoc());
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://shop.example/path", success("sig"))),
            Err(ProtocolViolation::UntrustedOrigin(_))
        ));
    }

    #[test]
    fn test_pinned_origin_disables_inference() {
        let config = ChannelConfig::default()
            .with_expected_origin(Origin::Tuple("https://shop.example".into()));
        let env = StaticFrame::srcdoc().with_referrer("https://elsewhere.example/");
        let mut channel = MessageChannel::new(RecordingPort::default(), &env, &config);
        assert_eq!(channel.target_origin(), Some("https://shop.example"));
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://elsewhere.example", success("sig"))),
            Err(ProtocolViolation::OriginMismatch { .. })
        ));
        assert!(channel
            .accept(&InboundEvent::from_parent("https://shop.example", success("sig")))
            .is_ok());
    }

    #[test]
    fn test_debug_mode_keeps_verdicts() {
        let config = ChannelConfig {
            debug: true,
            ..ChannelConfig::default()
        };
        let mut channel = MessageChannel::new(RecordingPort::default(), &hosted(), &config);
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://evil.example", success("sig"))),
            Err(ProtocolViolation::OriginMismatch { .. })
        ));
        assert!(matches!(
            channel.accept(&InboundEvent::from_parent("https://shop.example", json!({ "type": "walletList" }))),
            Err(ProtocolViolation::Malformed(_))
        ));
        assert!(channel
            .accept(&InboundEvent::from_parent("https://shop.example", success("sig")))
            .is_ok());
    }

    #[test]
    fn test_send_targets_locked_origin() {
        let channel = open(&hosted());
        channel.send(&connect_message()).unwrap();
        let sent = channel.port().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "https://shop.example");
        assert_eq!(sent[0].0["type"], "walletConnect");
        assert_eq!(sent[0].0["walletName"], "Phantom");
    }

    #[test]
    fn test_send_rejects_parent_messages() {
        let channel = open(&hosted());
        let message = WidgetMessage::PaymentSuccess(paylink_proto::PaymentSuccess {
            signature: "sig".into(),
        });
        assert!(matches!(
            channel.send(&message),
            Err(SendError::WrongDirection(MessageKind::PaymentSuccess))
        ));
        assert!(channel.port().sent().is_empty());
    }
}
