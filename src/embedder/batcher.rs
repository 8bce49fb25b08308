// batcher.rs - keeps embedding requests under the model's batch limit

#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    pub batch_size: usize,
}

impl Batcher {
    /// A batch size of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        items.chunks(self.batch_size).collect()
    }
}
