use crate::profile::Difficulty;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoteKind {
    Tap,
    Long { end: f64 },
}

impl NoteKind {
    /// Sort rank: taps before longs at the same time.
    fn rank(&self) -> u8 {
        match self {
            NoteKind::Tap => 0,
            NoteKind::Long { .. } => 1,
        }
    }
}

/// A note with an assigned lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub time: f64,  // seconds
    pub lane: u8,   // 0..LANE_COUNT
    pub kind: NoteKind,
}

impl Note {
    pub fn tap(time: f64, lane: u8) -> Self {
        Note { time, lane, kind: NoteKind::Tap }
    }

    pub fn long(time: f64, end: f64, lane: u8) -> Self {
        Note {
            time,
            lane,
            kind: NoteKind::Long { end },
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self.kind, NoteKind::Long { .. })
    }

    pub fn end_time(&self) -> Option<f64> {
        match self.kind {
            NoteKind::Tap => None,
            NoteKind::Long { end } => Some(end),
        }
    }

    /// Chart order: time, then taps before longs, then lane.
    pub fn chart_order(a: &Note, b: &Note) -> Ordering {
        a.time
            .total_cmp(&b.time)
            .then(a.kind.rank().cmp(&b.kind.rank()))
            .then(a.lane.cmp(&b.lane))
    }
}

/// A generated chart for one difficulty.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub difficulty: Difficulty,
    pub tempo: f64,
    pub duration: f64,
    pub preview_start_sec: f64,
    pub preview_duration_sec: f64,
    pub notes: Vec<Note>,
}

impl Chart {
    pub fn tap_count(&self) -> usize {
        self.notes.iter().filter(|n| !n.is_long()).count()
    }

    pub fn long_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_long()).count()
    }
}
