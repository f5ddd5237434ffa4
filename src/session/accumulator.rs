use crate::audio::Segment;

/// Append-only, arrival-ordered store of the segments of one recording phase
///
/// Segments are never reordered, deduplicated or dropped. The only way to
/// remove anything is `clear`, which the session calls when a new recording
/// phase begins.
#[derive(Debug, Default, Clone)]
pub struct ChunkAccumulator {
    segments: Vec<Segment>,
    total_bytes: usize,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment to the tail
    pub fn push(&mut self, segment: Segment) {
        self.total_bytes += segment.len();
        self.segments.push(segment);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segment payloads joined in arrival order
    pub fn concat(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.total_bytes);
        for segment in &self.segments {
            data.extend_from_slice(&segment.data);
        }
        data
    }
}
