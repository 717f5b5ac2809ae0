//! # Critical section nesting
//!
//! ## Overview
//! Reentrant global interrupt mask. The nesting depth is kept once for the
//! whole kernel (not per task) inside the kernel state.
//!
//! ## Assumptions
//! - The hart has a single global interrupt-enable bit and no nested or
//!   prioritized interrupt levels; this is a hardware assumption, not a
//!   general mutex
//! - A task never yields while it holds the mask
//!
//! ## Invariants
//! - `nested_level > 0` ⇒ the global enable bit is clear
//! - The bit is cleared on every `enter` and set only by the `exit` that
//!   brings the depth back to zero
//! - The depth never goes below zero
//!
//! ## Behavior
//! - Never blocks, so it cannot deadlock
//! - Must not be used by code that relies on interrupts staying enabled

use crate::hal::IntrGate;

#[derive(Debug, Default, Clone, Copy)]
pub struct IntrMaskingInfo {
    nested_level: usize,
}

impl IntrMaskingInfo {
    pub const fn new() -> Self {
        Self { nested_level: 0 }
    }

    pub fn depth(&self) -> usize {
        self.nested_level
    }

    pub fn enter<G: IntrGate + ?Sized>(&mut self, gate: &mut G) {
        gate.disable_interrupts();
        self.nested_level += 1;
    }

    /// Leave one level; an `exit` without matching `enter` is ignored
    pub fn exit<G: IntrGate + ?Sized>(&mut self, gate: &mut G) {
        let Some(level) = self.nested_level.checked_sub(1) else {
            log::error!("[kernel] critical section exit without enter");
            return;
        };
        self.nested_level = level;
        if level == 0 {
            gate.enable_interrupts();
        }
    }
}
