//! Cooperative Scheduler
//!
//! Two FIFO work queues drained by host-driven ticks: pending mounts and
//! dirty instances. A node sits at most once in each queue. The runtime
//! decides what a job does; this module only keeps order.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use fos_dom::NodeId;

/// Which queue a job lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    Mount,
    Dirty,
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub mounted: usize,
    pub rendered: usize,
    /// Jobs dropped because their node left the document or lost its instance
    pub skipped: usize,
    /// Jobs still queued for the next tick
    pub remaining: usize,
}

impl TickReport {
    pub(crate) fn absorb(&mut self, other: TickReport) {
        self.mounted += other.mounted;
        self.rendered += other.rendered;
        self.skipped += other.skipped;
        self.remaining = other.remaining;
    }
}

/// Ordered, deduplicated job queues
#[derive(Default)]
pub struct Scheduler {
    mount: VecDeque<NodeId>,
    dirty: VecDeque<NodeId>,
    queued: HashSet<(Queue, NodeId)>,
    frame_request: Option<Box<dyn FnMut()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called whenever a queue goes from empty to non-empty
    pub fn set_frame_request(&mut self, callback: impl FnMut() + 'static) {
        self.frame_request = Some(Box::new(callback));
    }

    /// Append `node` unless it is already queued. Returns whether it was added.
    pub fn enqueue(&mut self, queue: Queue, node: NodeId) -> bool {
        if !self.queued.insert((queue, node)) {
            return false;
        }
        let jobs = self.queue_mut(queue);
        let was_empty = jobs.is_empty();
        jobs.push_back(node);
        if was_empty {
            if let Some(request) = self.frame_request.as_mut() {
                request();
            }
        }
        true
    }

    pub fn pop(&mut self, queue: Queue) -> Option<NodeId> {
        let node = self.queue_mut(queue).pop_front()?;
        self.queued.remove(&(queue, node));
        Some(node)
    }

    /// Drop every job for `node`
    pub fn remove(&mut self, node: NodeId) {
        for queue in [Queue::Mount, Queue::Dirty] {
            if self.queued.remove(&(queue, node)) {
                self.queue_mut(queue).retain(|&queued| queued != node);
            }
        }
    }

    pub fn contains(&self, queue: Queue, node: NodeId) -> bool {
        self.queued.contains(&(queue, node))
    }

    pub fn queue_len(&self, queue: Queue) -> usize {
        match queue {
            Queue::Mount => self.mount.len(),
            Queue::Dirty => self.dirty.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.mount.len() + self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mount.is_empty() && self.dirty.is_empty()
    }

    fn queue_mut(&mut self, queue: Queue) -> &mut VecDeque<NodeId> {
        match queue {
            Queue::Mount => &mut self.mount,
            Queue::Dirty => &mut self.dirty,
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("mount", &self.mount)
            .field("dirty", &self.dirty)
            .field("frame_request", &self.frame_request.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_fifo_and_dedupe() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.enqueue(Queue::Dirty, NodeId(3)));
        assert!(scheduler.enqueue(Queue::Dirty, NodeId(1)));
        assert!(!scheduler.enqueue(Queue::Dirty, NodeId(3)));
        assert!(scheduler.enqueue(Queue::Mount, NodeId(3)));

        assert_eq!(scheduler.len(), 3);
        assert_eq!(scheduler.pop(Queue::Dirty), Some(NodeId(3)));
        assert_eq!(scheduler.pop(Queue::Dirty), Some(NodeId(1)));
        assert_eq!(scheduler.pop(Queue::Dirty), None);
        assert!(scheduler.contains(Queue::Mount, NodeId(3)));
    }

    #[test]
    fn test_requeue_after_pop() {
        let mut scheduler = Scheduler::new();
        scheduler.enqueue(Queue::Mount, NodeId(1));
        scheduler.pop(Queue::Mount);
        assert!(scheduler.enqueue(Queue::Mount, NodeId(1)));
    }

    #[test]
    fn test_remove_node_from_both_queues() {
        let mut scheduler = Scheduler::new();
        scheduler.enqueue(Queue::Mount, NodeId(1));
        scheduler.enqueue(Queue::Mount, NodeId(2));
        scheduler.enqueue(Queue::Dirty, NodeId(1));
        scheduler.remove(NodeId(1));

        assert_eq!(scheduler.queue_len(Queue::Mount), 1);
        assert_eq!(scheduler.queue_len(Queue::Dirty), 0);
        assert!(!scheduler.contains(Queue::Dirty, NodeId(1)));
    }

    #[test]
    fn test_frame_request_on_empty_transition() {
        let requests = Rc::new(Cell::new(0));
        let counter = Rc::clone(&requests);
        let mut scheduler = Scheduler::new();
        scheduler.set_frame_request(move || counter.set(counter.get() + 1));

        scheduler.enqueue(Queue::Dirty, NodeId(1));
        scheduler.enqueue(Queue::Dirty, NodeId(2));
        assert_eq!(requests.get(), 1);

        scheduler.enqueue(Queue::Mount, NodeId(1));
        assert_eq!(requests.get(), 2);

        scheduler.pop(Queue::Dirty);
        scheduler.pop(Queue::Dirty);
        scheduler.enqueue(Queue::Dirty, NodeId(5));
        assert_eq!(requests.get(), 3);
    }
}
