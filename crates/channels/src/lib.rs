//! Chat destinations and protocol-safe delivery.
//!
//! A destination implements [`ChatSink`]; [`MessageDelivery`] splits any
//! payload into messages the chat protocol accepts and sends them in order
//! with a single retry per chunk. Chat commands implement [`CommandHandler`]
//! and are looked up through a [`CommandRegistry`].

pub mod command;
pub mod delivery;
pub mod error;
pub mod gating;
pub mod registry;
pub mod sink;

pub use {
    command::{ChatRequest, CommandHandler, SayCommand},
    delivery::{DeliveryConfig, MessageDelivery, split_message},
    error::{Error, Result},
    registry::CommandRegistry,
    sink::ChatSink,
};
