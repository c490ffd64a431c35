//! Batch accumulator: buffers parsed records as a flat parameter list

/// Default number of rows per bulk insert.
pub const DEFAULT_BATCH_CAPACITY: usize = 5000;

/// Upper bound on the parameter slots reserved up front; larger batches grow on demand.
const PREALLOC_LIMIT: usize = 1 << 16;

/// A sealed batch of rows ready for a single bulk insert.
///
/// Rows are flattened in column order: `params.len() == rows * arity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    params: Vec<String>,
    rows: usize,
}

impl Batch {
    /// Flattened parameter values, row-major.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Number of logical rows
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Collects field tuples until the driver decides to flush.
///
/// Capacity is advisory: `add` never rejects a row, the driver checks
/// `is_full` after each add and flushes at exactly `capacity` rows.
#[derive(Debug)]
pub struct BatchAccumulator {
    params: Vec<String>,
    rows: usize,
    capacity: usize,
    arity: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: usize, arity: usize) -> Self {
        Self {
            params: Vec::with_capacity(prealloc(capacity, arity)),
            rows: 0,
            capacity,
            arity,
        }
    }

    /// Append one validated tuple.
    pub fn add(&mut self, fields: &[&str]) {
        debug_assert_eq!(fields.len(), self.arity, "tuple arity mismatch");
        self.params.extend(fields.iter().map(|f| (*f).to_string()));
        self.rows += 1;
    }

    /// Drop pending rows and start a fresh buffer.
    pub fn reset(&mut self) {
        self.params = Vec::with_capacity(prealloc(self.capacity, self.arity));
        self.rows = 0;
    }

    /// Pending row count
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn is_full(&self) -> bool {
        self.rows == self.capacity
    }

    /// Seal pending rows into a [`Batch`], leaving the accumulator empty.
    pub fn take_batch(&mut self) -> Batch {
        let params = std::mem::replace(
            &mut self.params,
            Vec::with_capacity(prealloc(self.capacity, self.arity)),
        );
        let rows = std::mem::take(&mut self.rows);
        Batch { params, rows }
    }
}

fn prealloc(capacity: usize, arity: usize) -> usize {
    capacity.saturating_mul(arity).min(PREALLOC_LIMIT)
}
