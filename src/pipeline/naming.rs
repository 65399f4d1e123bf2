//! Per-request output tags.
//!
//! Every worker passes the renderer an output prefix (`<dir>/<tag>`) and
//! poppler appends `-<page>.<ext>`. Tags must differ between the workers of
//! one request and from anything another request writes into a shared
//! directory. UUID tags get that for free. Counter tags draw from the
//! [`CounterCursor`](crate::config::CounterCursor) carried by the naming
//! itself, and [`TagSequence::next_free_tag`] steps over values whose files
//! are already on disk from an earlier run.

use crate::config::OutputFileNaming;
use tracing::debug;

/// Produces one tag per worker for a single request.
#[derive(Debug)]
pub struct TagSequence {
    naming: OutputFileNaming,
    workers: usize,
    issued: usize,
}

impl TagSequence {
    /// Sequence for a request that will spawn `workers` renderers.
    pub fn new(naming: &OutputFileNaming, workers: usize) -> Self {
        Self {
            naming: naming.clone(),
            workers,
            issued: 0,
        }
    }

    /// Tag for the next worker.
    pub fn next_tag(&mut self) -> String {
        let index = self.issued;
        self.issued += 1;
        match &self.naming {
            OutputFileNaming::Uuid => uuid::Uuid::new_v4().to_string(),
            OutputFileNaming::Counter { prefix, padding, cursor } => {
                format!("{prefix}{:0width$}", cursor.advance(), width = *padding)
            }
            OutputFileNaming::Fixed(name) if self.workers > 1 => format!("{name}_{index}"),
            OutputFileNaming::Fixed(name) => name.clone(),
        }
    }

    /// Like [`next_tag`](Self::next_tag), but counter values for which
    /// `in_use` returns `true` are skipped.
    ///
    /// Fixed names are returned as configured.
    pub fn next_free_tag(&mut self, in_use: impl Fn(&str) -> bool) -> String {
        loop {
            let tag = self.next_tag();
            if matches!(self.naming, OutputFileNaming::Counter { .. }) && in_use(&tag) {
                debug!("Output tag '{}' already has files; skipping", tag);
                continue;
            }
            return tag;
        }
    }
}

impl Iterator for TagSequence {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CounterCursor;

    #[test]
    fn counter_pads_and_increments() {
        let naming = OutputFileNaming::Counter {
            prefix: "scan".into(),
            padding: 4,
            cursor: CounterCursor::default(),
        };
        let tags: Vec<String> = TagSequence::new(&naming, 3).take(3).collect();
        assert_eq!(tags, vec!["scan0001", "scan0002", "scan0003"]);
    }

    #[test]
    fn counter_continues_across_requests() {
        let naming = OutputFileNaming::counter("p");
        assert_eq!(TagSequence::new(&naming, 1).next_tag(), "p0001");
        assert_eq!(TagSequence::new(&naming, 1).next_tag(), "p0002");

        let shared = naming.clone();
        let tags: Vec<String> = TagSequence::new(&shared, 2).take(2).collect();
        assert_eq!(tags, vec!["p0003", "p0004"]);
        assert_eq!(naming, shared);
    }

    #[test]
    fn separate_counters_are_independent() {
        let a = OutputFileNaming::counter("p");
        let b = OutputFileNaming::counter("p");
        assert_ne!(a, b);
        TagSequence::new(&a, 1).next_tag();
        assert_eq!(TagSequence::new(&b, 1).next_tag(), "p0001");
    }

    #[test]
    fn free_tag_skips_used_counter_values() {
        let naming = OutputFileNaming::counter("p");
        let mut seq = TagSequence::new(&naming, 2);
        let taken = ["p0001", "p0002"];
        assert_eq!(seq.next_free_tag(|t| taken.contains(&t)), "p0003");
        assert_eq!(seq.next_free_tag(|t| taken.contains(&t)), "p0004");
    }

    #[test]
    fn free_tag_keeps_fixed_names() {
        let naming = OutputFileNaming::Fixed("cover".into());
        assert_eq!(TagSequence::new(&naming, 1).next_free_tag(|_| true), "cover");
    }

    #[test]
    fn uuid_tags_are_distinct() {
        let mut seq = TagSequence::new(&OutputFileNaming::Uuid, 2);
        let a = seq.next_tag();
        let b = seq.next_tag();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn fixed_name_disambiguates_multiple_workers() {
        let naming = OutputFileNaming::Fixed("page".into());
        assert_eq!(TagSequence::new(&naming, 1).next_tag(), "page");
        let tags: Vec<String> = TagSequence::new(&naming, 2).take(2).collect();
        assert_eq!(tags, vec!["page_0", "page_1"]);
    }
}
