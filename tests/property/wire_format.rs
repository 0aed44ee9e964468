// Test-specific lint overrides: property tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::match_same_arms,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::missing_docs_in_private_items
)]

//! Property-based wire-format tests.
//!
//! Uses proptest to verify:
//! 1. Any valid `ServerEvent` survives a serialize → decode round-trip.
//! 2. Every `ClientEvent` encodes to a JSON object with a known `type` tag.
//! 3. Arbitrary text never causes a panic in `decode` (returns `Err` gracefully).
//! 4. Well-formed objects with unrecognized tags are classified, not confused
//!    with malformed input.

use proptest::prelude::*;
use palaver_proto::codec::{self, DecodeError};
use palaver_proto::domain::{ChatId, MessageId, Timestamp, User, UserId};
use palaver_proto::event::{ClientEvent, PresenceUser, ServerEvent};
use uuid::Uuid;

// --- Strategies for protocol types ---

fn arb_user_id() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

fn arb_chat_id() -> impl Strategy<Value = ChatId> {
    any::<u128>().prop_map(|n| ChatId::from_uuid(Uuid::from_u128(n)))
}

fn arb_message_id() -> impl Strategy<Value = MessageId> {
    any::<u128>().prop_map(|n| MessageId::from_uuid(Uuid::from_u128(n)))
}

fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    any::<i64>().prop_map(Timestamp::from_secs)
}

fn arb_user() -> impl Strategy<Value = User> {
    (arb_user_id(), "[a-zA-Z0-9_]{1,16}").prop_map(|(id, name)| User::new(id, name))
}

fn arb_readers() -> impl Strategy<Value = Vec<User>> {
    prop::collection::vec(arb_user(), 0..4)
}

fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        (
            arb_chat_id(),
            arb_message_id(),
            arb_user(),
            any::<String>(),
            arb_readers(),
            arb_timestamp(),
            arb_timestamp(),
        )
            .prop_map(
                |(chat_id, message_id, user, message, readers, created_at, updated_at)| {
                    ServerEvent::Message {
                        chat_id,
                        message_id,
                        user,
                        message,
                        readers,
                        created_at,
                        updated_at,
                    }
                }
            ),
        (arb_chat_id(), arb_message_id(), arb_readers()).prop_map(
            |(chat_id, message_id, readers)| ServerEvent::UpdateReaders {
                chat_id,
                message_id,
                readers,
            }
        ),
        (arb_chat_id(), "[a-zA-Z0-9_]{1,16}").prop_map(|(chat_id, username)| {
            ServerEvent::UserEnterChat {
                chat_id,
                user: PresenceUser { username },
            }
        }),
        (arb_chat_id(), "[a-zA-Z0-9_]{1,16}").prop_map(|(chat_id, username)| {
            ServerEvent::UserExitChat {
                chat_id,
                user: PresenceUser { username },
            }
        }),
    ]
}

fn arb_client_event() -> impl Strategy<Value = ClientEvent> {
    prop_oneof![
        Just(ClientEvent::Ping),
        (arb_chat_id(), arb_message_id(), arb_user_id()).prop_map(
            |(chat_id, message_id, user_id)| ClientEvent::UpdateReaders {
                chat_id,
                message_id,
                user_id,
            }
        ),
        arb_chat_id().prop_map(|chat_id| ClientEvent::UserEnterChat { chat_id }),
        arb_chat_id().prop_map(|chat_id| ClientEvent::UserExitChat { chat_id }),
    ]
}

// --- Property tests ---

proptest! {
    /// Any valid ServerEvent survives serialization followed by decode.
    #[test]
    fn server_event_round_trip(event in arb_server_event()) {
        let text = serde_json::to_string(&event).expect("serialize should succeed");
        let decoded = codec::decode(&text).expect("decode should succeed");
        prop_assert_eq!(event, decoded);
    }

    /// Every ClientEvent encodes to a JSON object carrying one of the
    /// outbound tags.
    #[test]
    fn client_event_carries_known_tag(event in arb_client_event()) {
        let text = codec::encode(&event).expect("encode should succeed");
        let value: serde_json::Value =
            serde_json::from_str(&text).expect("encoded frame is JSON");
        let tag = value["type"].as_str().expect("tag is a string");
        prop_assert!(
            ["PING", "UPDATE_READERS", "USER_ENTER_CHAT", "USER_EXIT_CHAT"].contains(&tag)
        );
    }

    /// Arbitrary text never causes a panic when decoded — it returns Err
    /// (or Ok for the rare valid frame) gracefully.
    #[test]
    fn arbitrary_text_decode_no_panic(text in ".{0,512}") {
        let _ = codec::decode(&text);
    }

    /// A well-formed object with an unrecognized tag is classified as
    /// UnknownType, never Malformed or MissingType.
    #[test]
    fn unknown_tags_are_classified(tag in "[A-Z_]{1,24}") {
        prop_assume!(
            !["MESSAGE", "UPDATE_READERS", "USER_ENTER_CHAT", "USER_EXIT_CHAT"]
                .contains(&tag.as_str())
        );
        let frame = serde_json::json!({"type": tag.clone()}).to_string();
        match codec::decode(&frame) {
            Err(DecodeError::UnknownType(seen)) => prop_assert_eq!(seen, tag),
            other => prop_assert!(false, "expected UnknownType, got {:?}", other),
        }
    }

    /// An object without a type tag is MissingType regardless of payload.
    #[test]
    fn missing_tag_is_classified(key in "[a-z]{1,12}", value in any::<i64>()) {
        prop_assume!(key != "type");
        let frame = serde_json::json!({key: value}).to_string();
        prop_assert!(matches!(codec::decode(&frame), Err(DecodeError::MissingType)));
    }
}
