//! # Ready set
//!
//! ## Overview
//! Priority-indexed collection of the tasks eligible to run:
//! - one FIFO ring of task handles per priority level, in round-robin order
//! - a bitmap with bit `p` set iff level `p` has at least one ready task
//!
//! Selection is O(1): the highest set bit of the bitmap gives the level,
//! the head of its ring gives the task.
//!
//! ## Invariants
//! - `bitmap & (1 << p) != 0` ⇔ `queues[p]` is non-empty
//! - A task appears in at most one ring, at most once
//! - The running task is never in the ready set
//!
//! ## Behavior
//! - The set only stores handles; task state changes are the caller's job

use crate::config::{MAX_PRIORITIES, MAX_TASKS};
use crate::task::TaskHandle;

/// Fixed-capacity FIFO ring of task handles
#[derive(Debug, Clone, Copy)]
struct TaskQueue {
    slots: [TaskHandle; MAX_TASKS],
    head: usize,
    len: usize,
}

impl TaskQueue {
    const fn new() -> Self {
        Self {
            slots: [TaskHandle::new(0); MAX_TASKS],
            head: 0,
            len: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push_back(&mut self, task: TaskHandle) {
        // every task is queued at most once, so the ring cannot overflow
        debug_assert!(self.len < MAX_TASKS);
        self.slots[(self.head + self.len) % MAX_TASKS] = task;
        self.len += 1;
    }

    fn pop_front(&mut self) -> Option<TaskHandle> {
        if self.is_empty() {
            return None;
        }
        let task = self.slots[self.head];
        self.head = (self.head + 1) % MAX_TASKS;
        self.len -= 1;
        Some(task)
    }

    fn front(&self) -> Option<TaskHandle> {
        (!self.is_empty()).then(|| self.slots[self.head])
    }

    fn iter(&self) -> impl Iterator<Item = TaskHandle> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % MAX_TASKS])
    }

    /// Drop `task` from the ring, keeping the order of the others
    fn remove(&mut self, task: TaskHandle) -> bool {
        let Some(pos) = self.iter().position(|t| t == task) else {
            return false;
        };
        for i in pos..self.len - 1 {
            self.slots[(self.head + i) % MAX_TASKS] = self.slots[(self.head + i + 1) % MAX_TASKS];
        }
        self.len -= 1;
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadySet {
    bitmap: u32,
    queues: [TaskQueue; MAX_PRIORITIES],
}

impl ReadySet {
    pub const fn new() -> Self {
        Self {
            bitmap: 0,
            queues: [TaskQueue::new(); MAX_PRIORITIES],
        }
    }

    pub fn bitmap(&self) -> u32 {
        self.bitmap
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap == 0
    }

    /// Most urgent level with a ready task
    pub fn highest_priority(&self) -> Option<u8> {
        highest_set_bit(self.bitmap)
    }

    /// Append `task` at the tail of its level
    pub fn enqueue(&mut self, task: TaskHandle, priority: u8) {
        self.queues[priority as usize].push_back(task);
        self.bitmap |= 1 << priority;
    }

    /// Pop the head of the most urgent non-empty level
    pub fn dequeue_highest(&mut self) -> Option<TaskHandle> {
        let priority = self.highest_priority()?;
        let queue = &mut self.queues[priority as usize];
        let task = queue.pop_front();
        if queue.is_empty() {
            self.bitmap &= !(1 << priority);
        }
        task
    }

    /// Move the head of `priority` to its tail
    pub fn rotate(&mut self, priority: u8) {
        let queue = &mut self.queues[priority as usize];
        if let Some(task) = queue.pop_front() {
            queue.push_back(task);
        }
    }

    /// Take `task` out of its level, for tasks that stop being ready
    pub fn remove(&mut self, task: TaskHandle, priority: u8) -> bool {
        let queue = &mut self.queues[priority as usize];
        let removed = queue.remove(task);
        if queue.is_empty() {
            self.bitmap &= !(1 << priority);
        }
        removed
    }

    /// Head of `priority`, the task that would run next at that level
    pub fn peek(&self, priority: u8) -> Option<TaskHandle> {
        self.queues[priority as usize].front()
    }

    pub fn contains(&self, task: TaskHandle) -> bool {
        self.queues.iter().any(|q| q.iter().any(|t| t == task))
    }

    /// Number of ready tasks over all levels
    pub fn len(&self) -> usize {
        self.queues.iter().map(|q| q.len).sum()
    }
}

/// Index of the most significant set bit, count-leading-zeros style
pub fn highest_set_bit(bitmap: u32) -> Option<u8> {
    (bitmap != 0).then(|| (31 - bitmap.leading_zeros()) as u8)
}
