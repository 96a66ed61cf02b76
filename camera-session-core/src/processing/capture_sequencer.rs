use std::collections::{HashMap, VecDeque};

use crate::models::captured_image::CapturedImage;
use crate::models::error::CameraError;

/// Outcome of one still capture request.
pub type CaptureOutcome = Result<CapturedImage, CameraError>;

/// Releases still-capture results strictly in request order.
///
/// Hardware may complete requests out of order; a result that arrives ahead
/// of an earlier request is parked until every earlier request has an
/// outcome. Request ids are never reused, not even across `clear()`, so a
/// late completion from a previous session cannot fill a new slot.
#[derive(Debug)]
pub struct CaptureSequencer {
    next_id: u64,
    pending: VecDeque<u64>,
    completed: HashMap<u64, CaptureOutcome>,
}

impl CaptureSequencer {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: VecDeque::new(),
            completed: HashMap::new(),
        }
    }

    /// Allocate the id for a new request and queue it.
    pub fn issue(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back(id);
        id
    }

    /// Record the outcome of request `id` and return every outcome that is now
    /// releasable, in request order.
    ///
    /// Unknown or already completed ids are ignored.
    pub fn complete(&mut self, id: u64, outcome: CaptureOutcome) -> Vec<CaptureOutcome> {
        if !self.pending.contains(&id) || self.completed.contains_key(&id) {
            return Vec::new();
        }
        self.completed.insert(id, outcome);

        let mut ready = Vec::new();
        while let Some(front) = self.pending.front().copied() {
            let Some(outcome) = self.completed.remove(&front) else {
                break;
            };
            self.pending.pop_front();
            ready.push(outcome);
        }
        ready
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains(&id)
    }

    /// Number of requests issued but not yet released.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Resolve every outstanding request, in request order.
    ///
    /// Parked outcomes are released as they are; requests the hardware never
    /// answered become `CaptureFailure`s.
    pub fn abandon(&mut self) -> Vec<CaptureOutcome> {
        let pending: Vec<u64> = self.pending.drain(..).collect();
        let outcomes = pending
            .into_iter()
            .map(|id| {
                self.completed.remove(&id).unwrap_or_else(|| {
                    Err(CameraError::CaptureFailure(format!(
                        "capture {} abandoned: camera closed",
                        id
                    )))
                })
            })
            .collect();
        self.completed.clear();
        outcomes
    }

    /// Drop every outstanding request.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.completed.clear();
    }
}

impl Default for CaptureSequencer {
    fn default() -> Self {
        Self::new()
    }
}
