//! Last-change recording for `.`.

use core_events::KeyToken;
use tracing::trace;

/// A finished change: the keys that produced it and the count it ran with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordedChange {
    pub count: Option<usize>,
    pub keys: Vec<KeyToken>,
}

#[derive(Debug, Default)]
pub struct DotRepeatRecorder {
    in_progress: Option<RecordedChange>,
    last: Option<RecordedChange>,
}

impl DotRepeatRecorder {
    /// Start a new change, discarding any unfinished one.
    pub fn begin(&mut self, count: Option<usize>, keys: &[KeyToken]) {
        trace!(target: "state.repeat", keys = keys.len(), ?count, "change_begin");
        self.in_progress = Some(RecordedChange {
            count,
            keys: keys.to_vec(),
        });
    }

    /// Append keys to the change in progress. Ignored when none is open.
    pub fn extend(&mut self, keys: &[KeyToken]) {
        if let Some(change) = self.in_progress.as_mut() {
            change.keys.extend_from_slice(keys);
        }
    }

    /// Close the change in progress and make it the last change.
    pub fn finish(&mut self) {
        if let Some(change) = self.in_progress.take() {
            trace!(target: "state.repeat", keys = change.keys.len(), "change_finish");
            self.last = Some(change);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.in_progress.is_some()
    }

    pub fn last(&self) -> Option<&RecordedChange> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::parse_key_sequence;

    #[test]
    fn change_lifecycle() {
        let mut rec = DotRepeatRecorder::default();
        rec.extend(&parse_key_sequence("x").unwrap());
        assert!(!rec.is_recording());
        assert!(rec.last().is_none());

        rec.begin(Some(2), &parse_key_sequence("R").unwrap());
        rec.extend(&parse_key_sequence("ab<Esc>").unwrap());
        assert!(rec.is_recording());
        rec.finish();
        let last = rec.last().unwrap();
        assert_eq!(last.count, Some(2));
        assert_eq!(last.keys, parse_key_sequence("Rab<Esc>").unwrap());
        assert!(!rec.is_recording());
    }
}
