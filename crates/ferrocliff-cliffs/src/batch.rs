//! Chunked enumeration of compound pairs.

/// Number of unordered pairs among `n` compounds: `n(n-1)/2`.
pub fn total_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Every unordered index pair `(i, j)` with `i < j < n`, row by row.
#[derive(Debug, Clone)]
pub struct PairIndices {
    n: usize,
    i: usize,
    j: usize,
}

impl PairIndices {
    pub fn new(n: usize) -> Self {
        Self { n, i: 0, j: 1 }
    }
}

impl Iterator for PairIndices {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.j >= self.n {
            self.i += 1;
            self.j = self.i + 1;
        }
        if self.j >= self.n {
            return None;
        }
        let pair = (self.i, self.j);
        self.j += 1;
        Some(pair)
    }
}

/// Groups items from a source iterator into batches of at most `batch_size`.
pub struct BatchIterator<I: Iterator> {
    source: I,
    batch_size: usize,
}

impl<I: Iterator> BatchIterator<I> {
    pub fn new(source: I, batch_size: usize) -> Self {
        Self { source, batch_size: batch_size.max(1) }
    }
}

impl<I: Iterator> Iterator for BatchIterator<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.source.by_ref().take(self.batch_size).collect();
        (!batch.is_empty()).then_some(batch)
    }
}

/// Pair indices of `n` compounds in chunks of `chunk_size` comparisons.
pub fn pair_chunks(n: usize, chunk_size: usize) -> BatchIterator<PairIndices> {
    BatchIterator::new(PairIndices::new(n), chunk_size)
}
