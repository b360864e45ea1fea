/// Advanced query options. `None` fields use the backend default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    /// Read-only traversal, the backend may refuse writes through the cursor connection.
    pub read_only: bool,
    /// Drop duplicate rows.
    pub distinct: bool,
    /// Rows buffered ahead of the consumer.
    pub fetch_size: Option<u32>,
    /// Hard cap on the rows produced.
    pub max_rows: Option<u32>,
    /// Rows skipped before the first returned one.
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    /// Lock the selected rows (if the backend supports row locks).
    pub for_update: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            read_only: true,
            distinct: false,
            fetch_size: None,
            max_rows: None,
            offset: None,
            limit: None,
            for_update: false,
        }
    }
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    pub fn max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn for_update(mut self, for_update: bool) -> Self {
        self.for_update = for_update;
        self
    }

    /// Smallest of `limit` and `max_rows`.
    pub fn row_cap(&self) -> Option<u32> {
        match (self.limit, self.max_rows) {
            (Some(l), Some(m)) => Some(l.min(m)),
            (l, m) => l.or(m),
        }
    }
}
