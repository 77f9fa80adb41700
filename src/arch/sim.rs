//! Host-side model of the ARMv7-M exception mechanism.
//!
//! Stands in for the hardware when the crate is built for the host: it keeps
//! a register file and a process stack pointer, stacks and unstacks the basic
//! exception frame on real stack memory, latches PENDSVSET, and runs the same
//! [`Scheduler::switch_context`] the PendSV handler calls, bracketed by the
//! r4-r11 push/pop the handler performs in assembly.

extern crate std;

use std::cell::Cell;

use super::Arch;
use crate::config::{CONTROL_UNPRIVILEGED, EXC_RETURN_THREAD_PSP, HW_FRAME_WORDS, SW_FRAME_WORDS};
use crate::sched::Scheduler;
use crate::thread::{HardwareFrame, SoftwareFrame};

/// EXC_RETURN for returning to Thread mode on the main stack.
pub const EXC_RETURN_THREAD_MSP: u32 = 0xFFFF_FFF9;

std::thread_local! {
    static PENDSV_PENDING: Cell<bool> = const { Cell::new(false) };
    static INTERRUPTS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Whether a context switch is armed.
pub fn pendsv_pending() -> bool {
    PENDSV_PENDING.with(Cell::get)
}

/// Drop an armed context switch.
pub fn clear_pendsv() {
    PENDSV_PENDING.with(|p| p.set(false));
}

/// Architecture implementation backed by the model.
pub struct SimArch;

impl Arch for SimArch {
    fn request_context_switch() {
        PENDSV_PENDING.with(|p| p.set(true));
    }

    fn enable_interrupts() {
        INTERRUPTS_ENABLED.with(|e| e.set(true));
    }

    fn disable_interrupts() {
        INTERRUPTS_ENABLED.with(|e| e.set(false));
    }

    fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.with(Cell::get)
    }

    fn wait_for_interrupt() {
        core::hint::spin_loop();
    }
}

/// Core registers visible to thread code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    /// r0-r12
    pub r: [u32; 13],
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

impl Registers {
    /// Registers with every general purpose register set to a distinct
    /// value derived from `seed`.
    pub fn patterned(seed: u32) -> Self {
        let mut regs = Self::default();
        for (i, r) in regs.r.iter_mut().enumerate() {
            *r = seed.wrapping_shl(8) | i as u32;
        }
        regs.lr = seed | 0x0800_0001;
        regs.pc = (seed | 0x0800_0000) & !1;
        regs.xpsr = 0x0100_0000;
        regs
    }

    pub fn software(&self) -> SoftwareFrame {
        let r = &self.r;
        SoftwareFrame {
            r4: r[4],
            r5: r[5],
            r6: r[6],
            r7: r[7],
            r8: r[8],
            r9: r[9],
            r10: r[10],
            r11: r[11],
        }
    }

    pub fn set_software(&mut self, frame: &SoftwareFrame) {
        self.r[4..12].copy_from_slice(&[
            frame.r4, frame.r5, frame.r6, frame.r7, frame.r8, frame.r9, frame.r10, frame.r11,
        ]);
    }

    pub fn hardware(&self) -> HardwareFrame {
        HardwareFrame {
            r0: self.r[0],
            r1: self.r[1],
            r2: self.r[2],
            r3: self.r[3],
            r12: self.r[12],
            lr: self.lr,
            pc: self.pc,
            xpsr: self.xpsr,
        }
    }

    pub fn set_hardware(&mut self, frame: &HardwareFrame) {
        self.r[..4].copy_from_slice(&[frame.r0, frame.r1, frame.r2, frame.r3]);
        self.r[12] = frame.r12;
        self.lr = frame.lr;
        self.pc = frame.pc;
        self.xpsr = frame.xpsr;
    }
}

/// A single-core ARMv7-M as far as the scheduler can observe it.
///
/// Starts out running `main` in Thread mode on the main stack, which the
/// model does not track.
pub struct Machine {
    /// Live register file.
    pub regs: Registers,
    /// Process stack pointer.
    pub psp: *mut u32,
    /// CONTROL register.
    pub control: u32,
    /// Hold PendSV off, as if a more urgent exception were still active.
    pub hold_switch: bool,
    on_process_stack: bool,
    exc_return: u32,
    switches: usize,
}

impl Machine {
    /// A machine running `main`, no switch armed.
    pub fn new() -> Self {
        clear_pendsv();
        Self {
            regs: Registers::default(),
            psp: core::ptr::null_mut(),
            control: 0,
            hold_switch: false,
            on_process_stack: false,
            exc_return: EXC_RETURN_THREAD_MSP,
            switches: 0,
        }
    }

    /// Whether thread code (as opposed to `main`) is executing.
    pub fn in_thread(&self) -> bool {
        self.on_process_stack
    }

    /// Context switches performed so far.
    pub fn switches(&self) -> usize {
        self.switches
    }

    /// Deliver a SysTick exception, tail-chaining into PendSV if armed.
    pub fn systick(&mut self, sched: &Scheduler) {
        self.exception_entry();
        sched.on_tick::<SimArch>();
        self.tail_chain(sched);
        self.exception_return();
    }

    /// Take an armed switch that was held off. Returns whether one was taken.
    pub fn service_pending_switch(&mut self, sched: &Scheduler) -> bool {
        if !pendsv_pending() || self.hold_switch {
            return false;
        }
        self.exception_entry();
        self.tail_chain(sched);
        self.exception_return();
        true
    }

    fn tail_chain(&mut self, sched: &Scheduler) {
        if pendsv_pending() && !self.hold_switch {
            clear_pendsv();
            unsafe { self.pendsv(sched) };
        }
    }

    fn exception_entry(&mut self) {
        if self.on_process_stack {
            unsafe {
                self.psp = self.psp.sub(HW_FRAME_WORDS);
                self.psp.cast::<HardwareFrame>().write(self.regs.hardware());
            }
            self.exc_return = EXC_RETURN_THREAD_PSP;
        } else {
            self.exc_return = EXC_RETURN_THREAD_MSP;
        }
    }

    fn exception_return(&mut self) {
        if self.exc_return == EXC_RETURN_THREAD_PSP {
            unsafe {
                let frame = self.psp.cast::<HardwareFrame>().read();
                self.regs.set_hardware(&frame);
                self.psp = self.psp.add(HW_FRAME_WORDS);
            }
            self.on_process_stack = true;
        }
    }

    /// The PendSV handler body, instruction for instruction.
    unsafe fn pendsv(&mut self, sched: &Scheduler) {
        // mrs r0, psp
        let mut sp = self.psp;
        // cbz: nothing to save on the first switch
        if !sched.current_descriptor().is_null() {
            // stmdb r0!, {r4-r11}
            unsafe {
                sp = sp.sub(SW_FRAME_WORDS);
                sp.cast::<SoftwareFrame>().write(self.regs.software());
            }
        }
        // bl switch_context
        sp = unsafe { sched.switch_context(sp) };
        // ldmia r0!, {r4-r11}
        unsafe {
            let frame = sp.cast::<SoftwareFrame>().read();
            self.regs.set_software(&frame);
            sp = sp.add(SW_FRAME_WORDS);
        }
        // msr psp, r0 / msr control / bx EXC_RETURN
        self.psp = sp;
        self.control = CONTROL_UNPRIVILEGED;
        self.exc_return = EXC_RETURN_THREAD_PSP;
        self.switches += 1;
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
