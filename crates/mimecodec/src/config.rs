//! Reader and writer configuration.

/// Maximum output line width used when folding headers and encoding content.
pub const MAX_LINE_WIDTH: usize = 76;

/// Default capacity of the reader's line buffer.
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

/// Default text written before the first boundary of a multipart message.
pub const DEFAULT_PREAMBLE: &str = "This is a multi-part message in MIME format.";

/// Codec configuration shared by the reader and the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the fixed line buffer used while reading.
    pub line_capacity: usize,
    /// Column budget for folded headers and encoded content lines.
    pub line_width: usize,
    /// Preamble written before the first boundary of a multipart message
    /// that carries no body text of its own.
    pub preamble: String,
}

impl Config {
    /// Creates a configuration with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line_capacity: DEFAULT_LINE_CAPACITY,
            line_width: MAX_LINE_WIDTH,
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    line_capacity: usize,
    line_width: usize,
    preamble: String,
}

impl ConfigBuilder {
    /// Creates a new builder with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line_capacity: DEFAULT_LINE_CAPACITY,
            line_width: MAX_LINE_WIDTH,
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }

    /// Sets the reader line buffer capacity.
    #[must_use]
    pub const fn line_capacity(mut self, capacity: usize) -> Self {
        self.line_capacity = capacity;
        self
    }

    /// Sets the writer line width.
    #[must_use]
    pub const fn line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Sets the multipart preamble.
    #[must_use]
    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Builds the configuration.
    ///
    /// The line width is clamped to at least 8 columns so that an encoded
    /// byte and a soft line break always fit on a line.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            line_capacity: self.line_capacity.max(1),
            line_width: self.line_width.max(8),
            preamble: self.preamble,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.line_capacity, 1024);
        assert_eq!(config.line_width, 76);
        assert_eq!(config.preamble, DEFAULT_PREAMBLE);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .line_capacity(4096)
            .line_width(64)
            .preamble("multipart")
            .build();

        assert_eq!(config.line_capacity, 4096);
        assert_eq!(config.line_width, 64);
        assert_eq!(config.preamble, "multipart");
    }

    #[test]
    fn test_config_builder_clamps_width() {
        let config = Config::builder().line_width(2).line_capacity(0).build();
        assert_eq!(config.line_width, 8);
        assert_eq!(config.line_capacity, 1);
    }
}
