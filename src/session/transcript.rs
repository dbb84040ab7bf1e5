use std::collections::BTreeMap;

/// Order-preserving transcript accumulator.
///
/// Transcription calls for different slices may complete out of order; the
/// transcript must still read in capture order. Fragments arriving early are
/// buffered by slice index and flushed once every earlier slice has resolved.
/// The text buffer is append-only; it is replaced wholesale only when a new
/// recording session starts.
#[derive(Debug, Default)]
pub struct Transcript {
    text: String,
    next_index: usize,
    pending: BTreeMap<usize, String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the fragment for slice `index`.
    ///
    /// Returns true if the visible text advanced (the fragment, and possibly
    /// buffered successors, were appended).
    pub fn insert(&mut self, index: usize, fragment: String) -> bool {
        if index < self.next_index {
            // Duplicate or late fragment for an already-flushed slice.
            return false;
        }
        self.pending.insert(index, fragment);

        let mut advanced = false;
        while let Some(fragment) = self.pending.remove(&self.next_index) {
            self.text.push_str(&fragment);
            self.next_index += 1;
            advanced = true;
        }
        advanced
    }

    /// Mark slice `index` as failed so fragments for later slices can still
    /// flush. Equivalent to an empty fragment.
    pub fn skip(&mut self, index: usize) {
        self.insert(index, String::new());
    }

    /// Current transcript text.
    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    /// Number of slices resolved (appended or skipped) in order so far.
    pub fn flushed(&self) -> usize {
        self.next_index
    }
}
