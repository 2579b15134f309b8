//! PipeWrench publish protocol.
//!
//! Wire types shared by everything that meets on the single publish
//! topic: the capture tool (`eye`), the desktop UI (`ui`), and the AI
//! agent (`agent`). This crate defines the JSON shapes and the
//! role-addressing filter only; it does not speak to any broker.

pub mod envelope;
pub mod image;

pub use envelope::{
    decode_for, ConversationSummary, Envelope, Payload, Role, StoredMessage, SHARED_TOPIC,
};
pub use image::ImagePayload;
