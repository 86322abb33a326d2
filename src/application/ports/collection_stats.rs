#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub name: String,
    pub total_chunks: usize,
    pub dimensions: Option<usize>,
    /// `false` while a build is in progress or after one was interrupted.
    pub complete: bool,
}
