// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stack-discipline register allocation.

use crate::compiler::ir::Operand;
use std::fmt;

/// A numbered temporary, rendered as `%rN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub usize);

impl Register {
    /// The register as a name operand.
    pub fn operand(self) -> Operand {
        Operand::Name(self.to_string())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%r{}", self.0)
    }
}

/// Hands out registers in LIFO order and records the peak.
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    live: usize,
    peak: usize,
    allocations: usize,
    frees: usize,
}

impl RegisterAllocator {
    /// Creates an allocator with nothing live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next free register.
    pub fn allocate(&mut self) -> Register {
        let reg = Register(self.live);
        self.live += 1;
        self.peak = self.peak.max(self.live);
        self.allocations += 1;
        reg
    }

    /// Releases the most recently allocated live register.
    pub fn free(&mut self, reg: Register) {
        debug_assert!(
            self.live > 0 && reg.0 == self.live - 1,
            "register {} freed out of order (live = {})",
            reg,
            self.live
        );
        self.live = self.live.saturating_sub(1);
        self.frees += 1;
    }

    /// Registers currently allocated.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Maximum simultaneous registers since the last reset.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Total allocations since the last reset.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Total frees since the last reset.
    pub fn frees(&self) -> usize {
        self.frees
    }

    /// Starts a new pass.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifo_allocation() {
        let mut regs = RegisterAllocator::new();
        let a = regs.allocate();
        let b = regs.allocate();
        assert_eq!((a, b), (Register(0), Register(1)));
        regs.free(b);
        let c = regs.allocate();
        assert_eq!(c, Register(1));
        regs.free(c);
        regs.free(a);

        assert_eq!(regs.live(), 0);
        assert_eq!(regs.peak(), 2);
        assert_eq!(regs.allocations(), regs.frees());
    }

    #[test]
    fn test_reset() {
        let mut regs = RegisterAllocator::new();
        let r = regs.allocate();
        regs.free(r);
        regs.reset();
        assert_eq!(regs.peak(), 0);
        assert_eq!(regs.allocations(), 0);
    }

    #[test]
    #[should_panic(expected = "freed out of order")]
    #[cfg(debug_assertions)]
    fn test_out_of_order_free_panics() {
        let mut regs = RegisterAllocator::new();
        let a = regs.allocate();
        let _b = regs.allocate();
        regs.free(a);
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register(3).to_string(), "%r3");
        assert_eq!(Register(0).operand(), Operand::name("%r0"));
    }
}
