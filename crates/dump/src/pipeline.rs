use std::{fmt, path::Path, sync::Arc};

use {
    chattext_channels::{ChatSink, MessageDelivery},
    chattext_common::text::cleaned_splits,
    tokio::{
        fs::File,
        io::{AsyncBufReadExt, BufReader},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    Error, PunctuationTokenizer, RandomSource, Result, SentenceTokenizer, StdRandom,
    StreamConfig, SupplementalLineSet,
};

/// Counters reported at the end of a dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub read_line_count: usize,
    pub discarded_line_count: usize,
    pub flush_count: usize,
    pub supplemental_line_count: usize,
    /// The run stopped early because its cancellation token fired.
    pub cancelled: bool,
}

impl fmt::Display for DumpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} line(s) were sent, and {} line(s) were discarded",
            self.read_line_count, self.discarded_line_count
        )
    }
}

/// Mutable state of a single dump run.
#[derive(Debug)]
pub struct StreamState {
    line_number: i64,
    read_line_count: usize,
    discarded_line_count: usize,
    buffer_index: usize,
    token_buffer: Vec<String>,
    flush_count: usize,
    supplemental_line_count: usize,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            line_number: -1,
            read_line_count: 0,
            discarded_line_count: 0,
            buffer_index: 0,
            token_buffer: Vec::new(),
            flush_count: 0,
            supplemental_line_count: 0,
        }
    }
}

impl StreamState {
    /// Zero-based number of the last line taken in, `-1` before the first.
    pub fn line_number(&self) -> i64 {
        self.line_number
    }

    pub fn buffered_tokens(&self) -> usize {
        self.token_buffer.len()
    }

    /// Take in one raw line. Returns `true` once the buffer is due for a flush.
    pub fn push_line(&mut self, line: &str, flush_threshold: usize) -> bool {
        self.line_number += 1;
        let tokens = cleaned_splits(line);
        if tokens.is_empty() {
            self.discarded_line_count += 1;
            return false;
        }
        self.read_line_count += 1;
        self.token_buffer.extend(tokens);
        self.buffer_index += 1;
        self.buffer_index >= flush_threshold && !self.token_buffer.is_empty()
    }

    /// Drain the buffer into one space-joined block.
    pub fn take_block(&mut self) -> String {
        let block = self.token_buffer.join(" ");
        self.token_buffer.clear();
        self.buffer_index = 0;
        self.flush_count += 1;
        block
    }

    fn summary(&self, cancelled: bool) -> DumpSummary {
        DumpSummary {
            read_line_count: self.read_line_count,
            discarded_line_count: self.discarded_line_count,
            flush_count: self.flush_count,
            supplemental_line_count: self.supplemental_line_count,
            cancelled,
        }
    }
}

/// Streams a file through the tokenizer into [`MessageDelivery`].
pub struct DumpPipeline {
    config: StreamConfig,
    delivery: MessageDelivery,
    tokenizer: Arc<dyn SentenceTokenizer>,
    random: Arc<dyn RandomSource>,
}

impl DumpPipeline {
    pub fn new(config: StreamConfig, delivery: MessageDelivery) -> Self {
        Self {
            config,
            delivery,
            tokenizer: Arc::new(PunctuationTokenizer),
            random: Arc::new(StdRandom::from_entropy()),
        }
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn SentenceTokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Stream `path` into `sink`.
    ///
    /// A partial buffer left at end of file or at cancellation is dropped.
    /// A delivery failure aborts the run.
    pub async fn dump(
        &self,
        path: &Path,
        sink: &dyn ChatSink,
        cancel: &CancellationToken,
    ) -> Result<DumpSummary> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SourceNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => return Err(Error::io(path, e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut state = StreamState::default();
        let threshold = self.config.buffer_flush_threshold();
        let mut cancelled = false;

        loop {
            let line = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                },
                line = lines.next_line() => line.map_err(|e| Error::io(path, e))?,
            };
            let Some(line) = line else {
                break;
            };
            if state.push_line(&line, threshold) {
                debug!(
                    line_number = state.line_number(),
                    tokens = state.buffered_tokens(),
                    "buffer is full, flushing"
                );
                self.flush(&mut state, sink).await?;
            }
        }

        if state.buffered_tokens() > 0 {
            debug!(
                tokens = state.buffered_tokens(),
                cancelled, "dropping partial buffer"
            );
        }
        Ok(state.summary(cancelled))
    }

    async fn flush(&self, state: &mut StreamState, sink: &dyn ChatSink) -> Result<()> {
        let block = state.take_block();
        let mut units = self.tokenizer.segment(&block);

        if self.random.next_unit() < self.config.supplemental_line_chance() {
            let set = SupplementalLineSet::load(self.config.supplemental_lines_source()).await?;
            if let Some(line) = set.choose(self.random.as_ref()) {
                info!(line, "adding supplemental line");
                units.push(line.to_string());
                state.supplemental_line_count += 1;
            }
        }

        for unit in &units {
            self.delivery.deliver(sink, unit).await?;
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_counts_blank_and_cleaned_lines() {
        let mut state = StreamState::default();
        assert_eq!(state.line_number(), -1);

        assert!(!state.push_line("  one   two ", 2));
        assert!(!state.push_line("   \t ", 2));
        assert!(state.push_line("three", 2));

        assert_eq!(state.line_number(), 2);
        assert_eq!(state.take_block(), "one two three");
        assert_eq!(state.buffered_tokens(), 0);

        let summary = state.summary(false);
        assert_eq!(summary.read_line_count, 2);
        assert_eq!(summary.discarded_line_count, 1);
        assert_eq!(summary.flush_count, 1);
    }

    #[test]
    fn summary_report_wording() {
        let summary = DumpSummary {
            read_line_count: 3,
            discarded_line_count: 1,
            ..DumpSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "3 line(s) were sent, and 1 line(s) were discarded"
        );
    }
}
