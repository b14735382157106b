//! Bounded range scans over an engine cursor
//!
//! `RangeLimitIter` is the only range API the store layer uses: a scan over
//! `[start, stop]` with configurable bound openness, an initial offset, and
//! a limit (`-1` means unlimited), in either direction.

use crate::EngineIterator;

/// Openness of the two range bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsKind {
    ClosedClosed,
    ClosedOpen,
    OpenClosed,
    OpenOpen,
}

impl BoundsKind {
    fn start_closed(self) -> bool {
        matches!(self, BoundsKind::ClosedClosed | BoundsKind::ClosedOpen)
    }

    fn stop_closed(self) -> bool {
        matches!(self, BoundsKind::ClosedClosed | BoundsKind::OpenClosed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Reverse,
}

/// Range scan with offset and limit over a raw cursor
///
/// `start`/`stop` are the low and high ends of the range regardless of
/// direction; a reverse scan begins at the high end. `None` means unbounded
/// on that side. `limit = -1` means unlimited.
pub struct RangeLimitIter<'a> {
    inner: Box<dyn EngineIterator + 'a>,
    start: Option<Vec<u8>>,
    stop: Option<Vec<u8>>,
    kind: BoundsKind,
    direction: Direction,
    remaining: i64,
}

impl<'a> RangeLimitIter<'a> {
    pub fn new(
        inner: Box<dyn EngineIterator + 'a>,
        start: Option<Vec<u8>>,
        stop: Option<Vec<u8>>,
        kind: BoundsKind,
        offset: usize,
        limit: i64,
    ) -> Self {
        Self::build(inner, start, stop, kind, offset, limit, Direction::Forward)
    }

    pub fn new_rev(
        inner: Box<dyn EngineIterator + 'a>,
        start: Option<Vec<u8>>,
        stop: Option<Vec<u8>>,
        kind: BoundsKind,
        offset: usize,
        limit: i64,
    ) -> Self {
        Self::build(inner, start, stop, kind, offset, limit, Direction::Reverse)
    }

    fn build(
        inner: Box<dyn EngineIterator + 'a>,
        start: Option<Vec<u8>>,
        stop: Option<Vec<u8>>,
        kind: BoundsKind,
        offset: usize,
        limit: i64,
        direction: Direction,
    ) -> Self {
        let mut it = Self {
            inner,
            start,
            stop,
            kind,
            direction,
            remaining: limit,
        };
        it.position();
        for _ in 0..offset {
            if !it.in_range() {
                break;
            }
            it.step();
        }
        it
    }

    fn position(&mut self) {
        match self.direction {
            Direction::Forward => match self.start.take() {
                Some(s) => {
                    self.inner.seek(&s);
                    if !self.kind.start_closed() && self.inner.valid() && self.inner.key() == s {
                        self.inner.next();
                    }
                    self.start = Some(s);
                }
                None => self.inner.first(),
            },
            Direction::Reverse => match self.stop.take() {
                Some(e) => {
                    self.inner.seek_for_prev(&e);
                    if !self.kind.stop_closed() && self.inner.valid() && self.inner.key() == e {
                        self.inner.prev();
                    }
                    self.stop = Some(e);
                }
                None => self.inner.last(),
            },
        }
    }

    fn step(&mut self) {
        match self.direction {
            Direction::Forward => self.inner.next(),
            Direction::Reverse => self.inner.prev(),
        }
    }

    /// Cursor is positioned inside the range, ignoring the limit.
    fn in_range(&self) -> bool {
        if !self.inner.valid() {
            return false;
        }
        let key = self.inner.key();
        match self.direction {
            Direction::Forward => match &self.stop {
                None => true,
                Some(e) => {
                    if self.kind.stop_closed() {
                        key <= e.as_slice()
                    } else {
                        key < e.as_slice()
                    }
                }
            },
            Direction::Reverse => match &self.start {
                None => true,
                Some(s) => {
                    if self.kind.start_closed() {
                        key >= s.as_slice()
                    } else {
                        key > s.as_slice()
                    }
                }
            },
        }
    }

    pub fn valid(&self) -> bool {
        self.remaining != 0 && self.in_range()
    }

    /// Advance to the next entry in scan direction.
    pub fn next(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        self.step();
    }

    pub fn key(&self) -> &[u8] {
        self.inner.key()
    }

    pub fn value(&self) -> &[u8] {
        self.inner.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, MemoryEngine};

    fn seeded() -> MemoryEngine {
        let eng = MemoryEngine::new();
        for k in [b"a", b"b", b"c", b"d", b"e"] {
            eng.put(k, k).unwrap();
        }
        eng
    }

    fn collect(it: &mut RangeLimitIter<'_>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while it.valid() {
            out.push(it.key().to_vec());
            it.next();
        }
        out
    }

    #[test]
    fn closed_open_forward() {
        let eng = seeded();
        let mut it = RangeLimitIter::new(
            eng.iterator().unwrap(),
            Some(b"b".to_vec()),
            Some(b"d".to_vec()),
            BoundsKind::ClosedOpen,
            0,
            -1,
        );
        assert_eq!(collect(&mut it), vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn open_bounds_exclude_endpoints() {
        let eng = seeded();
        let mut it = RangeLimitIter::new(
            eng.iterator().unwrap(),
            Some(b"b".to_vec()),
            Some(b"d".to_vec()),
            BoundsKind::OpenOpen,
            0,
            -1,
        );
        assert_eq!(collect(&mut it), vec![b"c".to_vec()]);
    }

    #[test]
    fn reverse_scan_starts_at_stop() {
        let eng = seeded();
        let mut it = RangeLimitIter::new_rev(
            eng.iterator().unwrap(),
            Some(b"b".to_vec()),
            Some(b"d".to_vec()),
            BoundsKind::ClosedClosed,
            0,
            -1,
        );
        assert_eq!(
            collect(&mut it),
            vec![b"d".to_vec(), b"c".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn offset_and_limit() {
        let eng = seeded();
        let mut it = RangeLimitIter::new(
            eng.iterator().unwrap(),
            None,
            None,
            BoundsKind::ClosedClosed,
            1,
            2,
        );
        assert_eq!(collect(&mut it), vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let eng = seeded();
        let mut it = RangeLimitIter::new(
            eng.iterator().unwrap(),
            Some(b"d".to_vec()),
            Some(b"e".to_vec()),
            BoundsKind::ClosedClosed,
            10,
            -1,
        );
        assert!(!it.valid());
    }

    #[test]
    fn zero_limit_yields_nothing() {
        let eng = seeded();
        let it = RangeLimitIter::new(
            eng.iterator().unwrap(),
            None,
            None,
            BoundsKind::ClosedClosed,
            0,
            0,
        );
        assert!(!it.valid());
    }
}
