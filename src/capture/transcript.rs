//! Accumulated transcript state for one logical recording

use super::engine::RecognizedSegment;

/// Append-only transcript accumulated across engine sessions
///
/// Final segments are durable; interim text is a transient preview that is
/// replaced on every result event and discarded on session end. The buffer
/// survives session restarts and is only reset when a new recording begins
/// or when the finalized text is taken.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    /// Finalized segment texts in emission order
    segments: Vec<String>,
    /// Number of final results already committed in the current session
    committed_in_session: usize,
    /// Latest interim preview, if any
    partial: Option<String>,
}

impl TranscriptBuffer {
    /// Reset per-session bookkeeping when a new engine session opens.
    ///
    /// Finalized text is kept; the service restarts its result indexing from
    /// zero, and any interim text from the dead session was never committed.
    pub fn begin_session(&mut self) {
        self.committed_in_session = 0;
        self.partial = None;
    }

    /// Apply one result event from the engine.
    ///
    /// Segments are positioned at `result_index + offset` within the current
    /// session. Final segments at positions not yet committed are appended in
    /// order; positions below the committed watermark are skipped, so a
    /// service re-reporting an overlapping range cannot duplicate text.
    /// Interim segments replace the preview. Returns true if any final text
    /// was appended.
    pub fn apply(&mut self, result_index: usize, segments: &[RecognizedSegment]) -> bool {
        let mut appended = false;
        let mut interim = String::new();

        for (offset, segment) in segments.iter().enumerate() {
            let position = result_index + offset;
            if segment.is_final {
                if position >= self.committed_in_session {
                    self.segments.push(segment.text.clone());
                    self.committed_in_session = position + 1;
                    appended = true;
                }
            } else {
                interim.push_str(&segment.text);
            }
        }

        self.partial = if interim.is_empty() {
            None
        } else {
            Some(interim)
        };
        appended
    }

    /// Current interim preview, if any
    pub fn partial(&self) -> Option<&str> {
        self.partial.as_deref()
    }

    /// Full finalized text accumulated so far
    pub fn full_text(&self) -> String {
        self.segments.concat()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Take the finalized text out and reset for the next recording
    pub fn take(&mut self) -> String {
        let text = self.segments.concat();
        self.segments.clear();
        self.committed_in_session = 0;
        self.partial = None;
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finals_append_in_order() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("Hello ")]);
        buf.apply(1, &[RecognizedSegment::final_text("there")]);
        assert_eq!(buf.full_text(), "Hello there");
    }

    #[test]
    fn test_overlapping_rereport_is_not_duplicated() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("Hello ")]);
        // Superset re-report from index 0
        let appended = buf.apply(
            0,
            &[
                RecognizedSegment::final_text("Hello "),
                RecognizedSegment::final_text("world"),
            ],
        );
        assert!(appended);
        assert_eq!(buf.full_text(), "Hello world");
    }

    #[test]
    fn test_session_restart_resumes_accumulation() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("Hello ")]);

        // New session indexes from zero again
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("world")]);
        assert_eq!(buf.full_text(), "Hello world");
    }

    #[test]
    fn test_interim_replaces_preview_and_is_never_appended() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();

        let appended = buf.apply(0, &[RecognizedSegment::interim_text("he")]);
        assert!(!appended);
        assert_eq!(buf.partial(), Some("he"));
        assert!(buf.is_empty());

        buf.apply(0, &[RecognizedSegment::interim_text("hel")]);
        assert_eq!(buf.partial(), Some("hel"));

        // Finalization clears the preview
        buf.apply(0, &[RecognizedSegment::final_text("hello")]);
        assert_eq!(buf.partial(), None);
        assert_eq!(buf.full_text(), "hello");
    }

    #[test]
    fn test_interim_dropped_on_session_end() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("kept ")]);
        buf.apply(1, &[RecognizedSegment::interim_text("lost")]);

        buf.begin_session();
        assert_eq!(buf.partial(), None);
        assert_eq!(buf.full_text(), "kept ");
    }

    #[test]
    fn test_take_resets_the_buffer() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("done")]);

        assert_eq!(buf.take(), "done");
        assert!(buf.is_empty());
        assert_eq!(buf.partial(), None);

        buf.begin_session();
        buf.apply(0, &[RecognizedSegment::final_text("next")]);
        assert_eq!(buf.full_text(), "next");
    }

    #[test]
    fn test_mixed_event_commits_finals_and_previews_interims() {
        let mut buf = TranscriptBuffer::default();
        buf.begin_session();
        let appended = buf.apply(
            0,
            &[
                RecognizedSegment::final_text("first "),
                RecognizedSegment::interim_text("sec"),
            ],
        );
        assert!(appended);
        assert_eq!(buf.full_text(), "first ");
        assert_eq!(buf.partial(), Some("sec"));
    }
}
