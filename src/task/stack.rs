//! # Task stacks
//!
//! ## Overview
//! All task stacks are carved out of one statically sized, 16-byte aligned
//! word array. Regions are handed out bump-style and never returned, since
//! tasks are never deleted.
//!
//! Inside the kernel a stack pointer is a `StackPtr`, a word index into the
//! arena. Only the trap boundary converts it to and from a real address, so
//! scheduling code never dereferences raw pointers.
//!
//! ## Invariants
//! - Regions never overlap and never move
//! - A fresh region is painted with `STACK_FILL`; the lowest
//!   `STACK_GUARD_WORDS` words must keep it for the task's whole life
//! - Stacks grow down, the initial frame sits at the 16-byte aligned top

use core::mem::size_of;

use crate::config::{STACK_ARENA_WORDS, STACK_FILL, STACK_GUARD_WORDS};
use crate::error::CreationError;
use crate::task::context::{TrapFrame, FRAME_WORDS};

/// Words per 16 bytes
const ALIGN_WORDS: usize = 16 / size_of::<usize>();

/// Word index into the stack arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StackPtr(usize);

impl StackPtr {
    pub const fn from_word(word: usize) -> Self {
        Self(word)
    }

    pub const fn word(self) -> usize {
        self.0
    }
}

/// Half-open word range `[lo, hi)` owned by one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    lo: usize,
    hi: usize,
}

impl StackRegion {
    pub fn words(&self) -> usize {
        self.hi - self.lo
    }

    /// Lowest word a trap frame may start at without touching the guard
    pub fn floor(&self) -> StackPtr {
        StackPtr(self.lo + STACK_GUARD_WORDS)
    }

    /// Whether a whole trap frame at `sp` lies inside the region
    pub fn holds_frame(&self, sp: StackPtr) -> bool {
        sp.0 >= self.lo && sp.0 + FRAME_WORDS <= self.hi
    }
}

#[repr(C, align(16))]
struct Words([usize; STACK_ARENA_WORDS]);

pub struct StackArena {
    words: Words,
    used: usize,
}

impl StackArena {
    pub const fn new() -> Self {
        Self {
            words: Words([0; STACK_ARENA_WORDS]),
            used: 0,
        }
    }

    /// Words not yet handed to any task
    pub fn remaining(&self) -> usize {
        STACK_ARENA_WORDS - self.used
    }

    /// Reserve `words` words for a new task and paint them
    ///
    /// ## Behavior
    /// - Fails with `StackExhausted` before touching anything when the
    ///   arena is too small
    pub fn carve(&mut self, words: usize) -> Result<StackRegion, CreationError> {
        if words > self.remaining() {
            return Err(CreationError::StackExhausted);
        }
        let region = StackRegion {
            lo: self.used,
            hi: self.used + words,
        };
        self.words.0[region.lo..region.hi].fill(STACK_FILL);
        self.used = region.hi;
        Ok(region)
    }

    /// Place the first trap frame of a task at the top of its region
    ///
    /// ## Returns
    /// - the saved stack pointer to store in the TCB
    pub fn build_initial_frame(&mut self, region: &StackRegion, entry: usize, arg: usize) -> StackPtr {
        let top = region.hi - region.hi % ALIGN_WORDS;
        let sp = StackPtr(top - FRAME_WORDS);
        *self.frame_mut(sp) = TrapFrame::initial(entry, arg);
        sp
    }

    pub fn frame(&self, sp: StackPtr) -> &TrapFrame {
        let words = &self.words.0[sp.0..sp.0 + FRAME_WORDS];
        // SAFETY: TrapFrame is repr(C), made of FRAME_WORDS usize fields,
        // and the slice is FRAME_WORDS usize-aligned words long.
        unsafe { &*(words.as_ptr() as *const TrapFrame) }
    }

    pub fn frame_mut(&mut self, sp: StackPtr) -> &mut TrapFrame {
        let words = &mut self.words.0[sp.0..sp.0 + FRAME_WORDS];
        // SAFETY: see `frame`
        unsafe { &mut *(words.as_mut_ptr() as *mut TrapFrame) }
    }

    /// Whether the guard words at the low edge still hold the fill pattern
    pub fn guard_intact(&self, region: &StackRegion) -> bool {
        self.words.0[region.lo..region.lo + STACK_GUARD_WORDS]
            .iter()
            .all(|&w| w == STACK_FILL)
    }

    /// Words at the bottom of the region never written since creation
    pub fn high_water_mark(&self, region: &StackRegion) -> usize {
        self.words.0[region.lo..region.hi]
            .iter()
            .take_while(|&&w| w == STACK_FILL)
            .count()
    }

    /// Address of the word `sp` points at
    pub fn addr_of(&self, sp: StackPtr) -> usize {
        self.words.0.as_ptr() as usize + sp.0 * size_of::<usize>()
    }

    /// Inverse of `addr_of`
    ///
    /// ## Returns
    /// - `None` for an address outside the arena or not word aligned
    pub fn ptr_at(&self, addr: usize) -> Option<StackPtr> {
        let base = self.words.0.as_ptr() as usize;
        let offset = addr.checked_sub(base)?;
        if offset % size_of::<usize>() != 0 {
            return None;
        }
        let word = offset / size_of::<usize>();
        (word < STACK_ARENA_WORDS).then_some(StackPtr(word))
    }
}
