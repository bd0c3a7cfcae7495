use std::path::{Path, PathBuf};

use chattext_config::{
    DumpSection,
    schema::{
        DEFAULT_BUFFER_FLUSH_THRESHOLD, DEFAULT_SUPPLEMENTAL_LINE_CHANCE,
        DEFAULT_SUPPLEMENTAL_LINES_FILE, MAX_BUFFER_FLUSH_THRESHOLD,
    },
};

use crate::{Error, Result};

/// Validated streaming settings. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    buffer_flush_threshold: usize,
    supplemental_line_chance: f64,
    supplemental_lines_source: PathBuf,
}

impl StreamConfig {
    pub fn new(
        buffer_flush_threshold: usize,
        supplemental_line_chance: f64,
        supplemental_lines_source: impl Into<PathBuf>,
    ) -> Result<Self> {
        if !(1..=MAX_BUFFER_FLUSH_THRESHOLD).contains(&buffer_flush_threshold) {
            return Err(Error::invalid_config(
                "buffer_flush_threshold",
                format!(
                    "must be between 1 and {MAX_BUFFER_FLUSH_THRESHOLD}, got {buffer_flush_threshold}"
                ),
            ));
        }
        if !supplemental_line_chance.is_finite() || !(0.0..=1.0).contains(&supplemental_line_chance)
        {
            return Err(Error::invalid_config(
                "supplemental_line_chance",
                format!("must be within [0, 1], got {supplemental_line_chance}"),
            ));
        }
        Ok(Self {
            buffer_flush_threshold,
            supplemental_line_chance,
            supplemental_lines_source: supplemental_lines_source.into(),
        })
    }

    pub fn buffer_flush_threshold(&self) -> usize {
        self.buffer_flush_threshold
    }

    pub fn supplemental_line_chance(&self) -> f64 {
        self.supplemental_line_chance
    }

    pub fn supplemental_lines_source(&self) -> &Path {
        &self.supplemental_lines_source
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_flush_threshold: DEFAULT_BUFFER_FLUSH_THRESHOLD,
            supplemental_line_chance: DEFAULT_SUPPLEMENTAL_LINE_CHANCE,
            supplemental_lines_source: PathBuf::from(DEFAULT_SUPPLEMENTAL_LINES_FILE),
        }
    }
}

impl TryFrom<&DumpSection> for StreamConfig {
    type Error = Error;

    fn try_from(section: &DumpSection) -> Result<Self> {
        Self::new(
            section.buffer_flush_threshold,
            section.supplemental_line_chance,
            section.supplemental_lines_file.clone(),
        )
    }
}
