/// 1-based location of a batch within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchPosition {
    pub number: u64,
    pub total: u64,
}

impl BatchPosition {
    pub fn new(number: u64, total: u64) -> Self {
        Self { number, total }
    }
}

/// Splits a fixed collection into contiguous, order-preserving batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlan {
    item_count: usize,
    batch_size: usize,
}

impl BatchPlan {
    pub fn new(item_count: usize, batch_size: usize) -> Self {
        Self {
            item_count,
            batch_size: batch_size.max(1),
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `ceil(item_count / batch_size)`; zero for an empty collection.
    pub fn total_batches(&self) -> u64 {
        self.item_count.div_ceil(self.batch_size) as u64
    }

    /// Yields each batch slice with its position.
    pub fn batches<'a, T>(
        &self,
        items: &'a [T],
    ) -> impl Iterator<Item = (BatchPosition, &'a [T])> + 'a {
        let total = self.total_batches();
        items
            .chunks(self.batch_size)
            .enumerate()
            .map(move |(index, chunk)| (BatchPosition::new(index as u64 + 1, total), chunk))
    }
}
