//! Conversation history.
//!
//! The [`MessageStore`] owns every entry of one chat session and projects
//! it into the shapes the model endpoint and the presentation layer need.

mod store;

pub use store::{Message, MessageBody, MessageStore, Projection, Role};
