//! Streams a text file into chat.
//!
//! Raw lines are cleaned into word tokens and buffered. Every
//! `buffer_flush_threshold` non-blank lines the buffer is re-tokenized into
//! sentences, optionally topped up with a supplemental line, and handed to
//! [`MessageDelivery`](chattext_channels::MessageDelivery).

pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod random;
pub mod supplemental;
pub mod tokenizer;

pub use {
    command::DumpCommand,
    config::StreamConfig,
    error::{Error, Result},
    pipeline::{DumpPipeline, DumpSummary, StreamState},
    random::{RandomSource, StdRandom},
    supplemental::SupplementalLineSet,
    tokenizer::{PunctuationTokenizer, SentenceTokenizer},
};
