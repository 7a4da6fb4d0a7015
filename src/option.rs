/// Default number of rows fetched from the transport per scan round trip.
pub const DEFAULT_SCAN_CACHING: usize = 100;

/// Default number of rows a [`ScanStream`](crate::ScanStream) buffers ahead of the reader.
pub const DEFAULT_SCAN_BUFFER: usize = 256;

/// Default upper bound on a single cell value, in bytes.
pub const DEFAULT_MAX_KEY_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// Longest row key the store accepts.
pub const MAX_ROW_LENGTH: usize = i16::MAX as usize;

/// Client-side options shared by every table of a connection.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub(crate) scan_caching: usize,
    pub(crate) scan_buffer: usize,
    pub(crate) max_key_value_size: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            scan_caching: DEFAULT_SCAN_CACHING,
            scan_buffer: DEFAULT_SCAN_BUFFER,
            max_key_value_size: DEFAULT_MAX_KEY_VALUE_SIZE,
        }
    }
}

impl TableOptions {
    /// Rows per fetch for scans that do not set their own caching. Clamped to at least one.
    pub fn scan_caching(self, scan_caching: usize) -> Self {
        TableOptions {
            scan_caching: scan_caching.max(1),
            ..self
        }
    }

    /// Rows buffered between the transport and a [`ScanStream`](crate::ScanStream) reader.
    pub fn scan_buffer(self, scan_buffer: usize) -> Self {
        TableOptions {
            scan_buffer: scan_buffer.max(1),
            ..self
        }
    }

    /// Largest value accepted by `put`, `append` and check-and-mutate.
    pub fn max_key_value_size(self, max_key_value_size: usize) -> Self {
        TableOptions {
            max_key_value_size,
            ..self
        }
    }

    pub(crate) fn caching(&self) -> usize {
        self.scan_caching
    }

    pub(crate) fn buffer(&self) -> usize {
        self.scan_buffer
    }

    pub(crate) fn value_limit(&self) -> usize {
        self.max_key_value_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let options = TableOptions::default()
            .scan_caching(0)
            .scan_buffer(8)
            .max_key_value_size(64);
        assert_eq!(options.caching(), 1);
        assert_eq!(options.buffer(), 8);
        assert_eq!(options.value_limit(), 64);
    }
}
