//! Store configuration.

/// Configuration for opening a store environment.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the environment directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Size of the memory map, which bounds the total environment size.
    pub map_size: usize,

    /// Fixed upper bound on the number of named sub-databases the
    /// environment may hold. Each molecule consumes two entity
    /// sub-databases plus two staging sub-databases.
    pub max_collections: u32,

    /// Maximum number of concurrent read transactions.
    pub max_readers: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            map_size: 1024 * 1024 * 1024, // 1 GiB
            max_collections: 100,
            max_readers: 126,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the environment directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the memory map size.
    #[must_use]
    pub const fn map_size(mut self, size: usize) -> Self {
        self.map_size = size;
        self
    }

    /// Sets the sub-database cap.
    #[must_use]
    pub const fn max_collections(mut self, value: u32) -> Self {
        self.max_collections = value;
        self
    }

    /// Sets the reader cap.
    #[must_use]
    pub const fn max_readers(mut self, value: u32) -> Self {
        self.max_readers = value;
        self
    }
}
