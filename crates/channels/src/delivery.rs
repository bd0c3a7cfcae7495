//! Protocol-safe message delivery.
//!
//! A payload shorter than the message ceiling goes out untouched. Longer
//! payloads are split at whitespace into chunks that each end before the soft
//! target length, the whole chunk plan is checked against the message-count
//! cap, and only then is anything sent. Each chunk gets one retry after a
//! fixed backoff.

use std::time::Duration;

use {
    chattext_common::text::{char_len, is_blank},
    chattext_config::schema::{
        DEFAULT_MAX_MESSAGE_COUNT, DEFAULT_RETRY_BACKOFF_SECS, DEFAULT_TARGET_LENGTH,
        DeliverySection, MIN_TARGET_LENGTH, TWITCH_MAX_MESSAGE_LEN,
    },
    tracing::{debug, warn},
};

use crate::{ChatSink, Error, Result};

/// Validated delivery limits. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    max_message_length: usize,
    per_message_target_length: usize,
    max_message_count: usize,
    retry_backoff: Duration,
}

impl DeliveryConfig {
    pub fn new(
        max_message_length: usize,
        per_message_target_length: usize,
        max_message_count: usize,
        retry_backoff: Duration,
    ) -> Result<Self> {
        if per_message_target_length < MIN_TARGET_LENGTH {
            return Err(Error::invalid_config(
                "per_message_target_length",
                format!("{per_message_target_length} is too small (min is {MIN_TARGET_LENGTH})"),
            ));
        }
        if per_message_target_length >= max_message_length {
            return Err(Error::invalid_config(
                "per_message_target_length",
                format!(
                    "{per_message_target_length} is too big (must be below max_message_length {max_message_length})"
                ),
            ));
        }
        if max_message_count < 1 {
            return Err(Error::invalid_config(
                "max_message_count",
                format!("{max_message_count} is out of bounds"),
            ));
        }
        Ok(Self {
            max_message_length,
            per_message_target_length,
            max_message_count,
            retry_backoff,
        })
    }

    #[must_use]
    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    #[must_use]
    pub fn per_message_target_length(&self) -> usize {
        self.per_message_target_length
    }

    #[must_use]
    pub fn max_message_count(&self) -> usize {
        self.max_message_count
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_message_length: TWITCH_MAX_MESSAGE_LEN,
            per_message_target_length: DEFAULT_TARGET_LENGTH,
            max_message_count: DEFAULT_MAX_MESSAGE_COUNT,
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }
}

impl TryFrom<&DeliverySection> for DeliveryConfig {
    type Error = Error;

    fn try_from(section: &DeliverySection) -> Result<Self> {
        Self::new(
            section.max_message_length,
            section.per_message_target_length,
            section.max_message_count,
            Duration::from_secs(section.retry_backoff_secs),
        )
    }
}

/// Split `payload` into chunks that each fit under the message ceiling.
///
/// Lengths are counted in characters. Chunks are trimmed; rejoining them with
/// single spaces yields the payload's word sequence. Returns
/// [`Error::UnsplittableMessage`] when an oversize chunk has no whitespace
/// before the target length and [`Error::TooManyChunks`] when the plan
/// exceeds the message-count cap.
pub fn split_message(payload: &str, config: &DeliveryConfig) -> Result<Vec<String>> {
    if char_len(payload) < config.max_message_length {
        return Ok(vec![payload.to_string()]);
    }

    let mut messages = vec![payload.trim().to_string()];
    let mut index = 0;

    while index < messages.len() {
        let message = &messages[index];
        if char_len(message) < config.max_message_length {
            index += 1;
            continue;
        }

        let Some(split_at) = find_split_point(message, config.per_message_target_length) else {
            return Err(Error::UnsplittableMessage {
                length: char_len(payload),
            });
        };

        let head = message[..split_at].trim().to_string();
        let tail = message[split_at..].trim().to_string();
        messages[index] = head;
        messages.push(tail);
    }

    if messages.len() > config.max_message_count {
        return Err(Error::TooManyChunks {
            count: messages.len(),
            max: config.max_message_count,
        });
    }

    Ok(messages)
}

/// Byte index of the last whitespace whose character position is below `target`.
fn find_split_point(message: &str, target: usize) -> Option<usize> {
    message
        .char_indices()
        .take(target)
        .filter(|(_, c)| c.is_whitespace())
        .map(|(byte_index, _)| byte_index)
        .last()
}

/// Sends arbitrary-length text through a [`ChatSink`] as protocol-legal messages.
#[derive(Debug, Clone, Default)]
pub struct MessageDelivery {
    config: DeliveryConfig,
}

impl MessageDelivery {
    #[must_use]
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Deliver `payload` in full, or fail without sending when it can't be split.
    ///
    /// Blank payloads are skipped. Returns the number of messages sent.
    pub async fn deliver(&self, sink: &dyn ChatSink, payload: &str) -> Result<usize> {
        if is_blank(payload) {
            return Ok(0);
        }

        let chunks = split_message(payload, &self.config)?;
        if chunks.len() > 1 {
            debug!(
                channel = sink.target(),
                payload_len = char_len(payload),
                chunk_count = chunks.len(),
                "splitting oversize message"
            );
        }

        for (index, chunk) in chunks.iter().enumerate() {
            self.send_with_retry(sink, index, chunk).await?;
        }

        Ok(chunks.len())
    }

    async fn send_with_retry(&self, sink: &dyn ChatSink, index: usize, chunk: &str) -> Result<()> {
        let Err(first) = sink.send_text(chunk).await else {
            return Ok(());
        };

        let backoff = self.config.retry_backoff;
        warn!(
            channel = sink.target(),
            chunk = index,
            error = %first,
            backoff_secs = backoff.as_secs(),
            "chat send failed, retrying once after backoff"
        );
        tokio::time::sleep(backoff).await;

        sink.send_text(chunk).await.map_err(|source| {
            warn!(
                channel = sink.target(),
                chunk = index,
                error = %source,
                "chat send retry failed, abandoning remaining chunks"
            );
            Error::SendFailed {
                index,
                attempts: 2,
                source: Box::new(source),
            }
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        rstest::rstest,
        std::{
            collections::HashSet,
            sync::{
                Mutex,
                atomic::{AtomicUsize, Ordering},
            },
        },
    };

    /// Records sends; attempts listed in `failing_attempts` return an error.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        failing_attempts: HashSet<usize>,
    }

    impl RecordingSink {
        fn failing_on(attempts: &[usize]) -> Self {
            Self {
                failing_attempts: attempts.iter().copied().collect(),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        fn target(&self) -> &str {
            "test"
        }

        async fn send_text(&self, text: &str) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing_attempts.contains(&attempt) {
                return Err(Error::unavailable("connection reset"));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Words of cycling length 1..=12 joined by single spaces.
    fn wordy_payload(min_len: usize) -> String {
        let mut words = Vec::new();
        let mut len = 0;
        let mut i = 0usize;
        while len < min_len {
            let word: String = std::iter::repeat_n(char::from(b'a' + (i % 26) as u8), i % 12 + 1)
                .collect();
            len += word.len() + 1;
            words.push(word);
            i += 1;
        }
        words.join(" ")
    }

    fn roomy_config() -> DeliveryConfig {
        DeliveryConfig::new(500, 450, 50, Duration::from_secs(40)).unwrap()
    }

    #[rstest]
    #[case(500, 299, 5)]
    #[case(500, 500, 5)]
    #[case(500, 501, 5)]
    #[case(500, 450, 0)]
    fn invalid_configs_rejected(
        #[case] max_len: usize,
        #[case] target: usize,
        #[case] max_count: usize,
    ) {
        let err = DeliveryConfig::new(max_len, target, max_count, Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }), "{err}");
    }

    #[test]
    fn default_config_matches_section_defaults() {
        let from_section = DeliveryConfig::try_from(&DeliverySection::default()).unwrap();
        assert_eq!(from_section, DeliveryConfig::default());
    }

    #[tokio::test]
    async fn short_payload_sent_once_unmodified() {
        let sink = RecordingSink::default();
        let delivery = MessageDelivery::default();
        let payload = "  hello there, chat!  ";

        let sent = delivery.deliver(&sink, payload).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(sink.sent(), vec![payload.to_string()]);
    }

    #[tokio::test]
    async fn blank_payload_is_a_silent_noop() {
        let sink = RecordingSink::default();
        let delivery = MessageDelivery::default();

        assert_eq!(delivery.deliver(&sink, "").await.unwrap(), 0);
        assert_eq!(delivery.deliver(&sink, " \t\n ").await.unwrap(), 0);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn payload_of_exactly_the_ceiling_is_split() {
        let mut payload = vec!["abcd"; 100].join(" ");
        payload.push('e');
        assert_eq!(payload.len(), 500);

        let chunks = split_message(&payload, &DeliveryConfig::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 449);
    }

    #[test]
    fn nine_hundred_chars_split_into_two_chunks() {
        let mut words: Vec<String> = (0..90).map(|i| format!("w{i:08}")).collect();
        words[89].push('x');
        let payload = words.join(" ");
        assert_eq!(payload.len(), 900);

        let chunks = split_message(&payload, &DeliveryConfig::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() < 500));
        // Split lands on the space at index 449.
        assert_eq!(chunks[0].len(), 449);
        assert_eq!(&payload[449..450], " ");
        assert_eq!(format!("{} {}", chunks[0], chunks[1]), payload);
    }

    #[test]
    fn splitting_preserves_word_sequence() {
        for min_len in [500, 777, 1_500, 4_000, 9_000] {
            let payload = wordy_payload(min_len);
            let chunks = split_message(&payload, &roomy_config()).unwrap();

            assert!(chunks.iter().all(|c| char_len(c) < 500));
            let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
            let original: Vec<&str> = payload.split_whitespace().collect();
            assert_eq!(rejoined, original, "payload of {min_len} chars");
        }
    }

    #[test]
    fn splits_on_tabs_and_newlines() {
        // Any whitespace counts as a word boundary, not only spaces.
        let payload = vec!["abcdefghi"; 60].join("\n");
        assert!(!payload.contains(' '));

        let chunks = split_message(&payload, &DeliveryConfig::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 449);
        assert!(chunks.iter().all(|c| c.trim() == c));

        let tabbed = vec!["abcdefghi"; 60].join("\t");
        assert_eq!(split_message(&tabbed, &DeliveryConfig::default()).unwrap().len(), 2);
    }

    #[test]
    fn lengths_count_characters() {
        // Under the ceiling in characters, over it in bytes.
        let payload = vec!["éééééééééé"; 44].join(" ");
        assert!(char_len(&payload) < 500 && payload.len() > 500);
        let chunks = split_message(&payload, &DeliveryConfig::default()).unwrap();
        assert_eq!(chunks, vec![payload]);

        let payload = vec!["éééééééééé"; 60].join(" ");
        let chunks = split_message(&payload, &DeliveryConfig::default()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| char_len(c) < 450));
    }

    #[tokio::test]
    async fn too_many_chunks_sends_nothing() {
        let sink = RecordingSink::default();
        let delivery = MessageDelivery::default();
        let payload = wordy_payload(3_000);

        let err = delivery.deliver(&sink, &payload).await.unwrap_err();

        assert!(matches!(err, Error::TooManyChunks { max: 5, .. }), "{err}");
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn unbroken_token_is_unsplittable() {
        let sink = RecordingSink::default();
        let delivery = MessageDelivery::default();

        let err = delivery.deliver(&sink, &"a".repeat(600)).await.unwrap_err();
        assert!(matches!(err, Error::UnsplittableMessage { length: 600 }));

        let err = delivery
            .deliver(&sink, &format!("  {}  ", "b".repeat(500)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsplittableMessage { .. }));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn unsplittable_tail_aborts_before_any_send() {
        let sink = RecordingSink::default();
        let delivery = MessageDelivery::default();
        let payload = format!("{} {}", wordy_payload(300), "z".repeat(700));

        let err = delivery.deliver(&sink, &payload).await.unwrap_err();

        assert!(matches!(err, Error::UnsplittableMessage { .. }));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_is_retried_once_after_backoff() {
        let sink = RecordingSink::failing_on(&[1]);
        let delivery = MessageDelivery::default();
        let payload = wordy_payload(1_200);
        let expected = split_message(&payload, delivery.config()).unwrap();

        let started = tokio::time::Instant::now();
        let sent = delivery.deliver(&sink, &payload).await.unwrap();

        assert_eq!(sent, expected.len());
        assert_eq!(sink.sent(), expected);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), expected.len() + 1);
        assert!(started.elapsed() >= Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn second_failure_abandons_remaining_chunks() {
        let sink = RecordingSink::failing_on(&[1, 2]);
        let delivery = MessageDelivery::default();
        let payload = wordy_payload(1_200);
        let expected = split_message(&payload, delivery.config()).unwrap();
        assert!(expected.len() >= 3);

        let err = delivery.deliver(&sink, &payload).await.unwrap_err();

        assert!(
            matches!(err, Error::SendFailed { index: 1, attempts: 2, .. }),
            "{err}"
        );
        assert_eq!(sink.sent(), vec![expected[0].clone()]);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
    }
}
