//! ARMv7-M (Cortex-M3/M4/M7) port.
//!
//! # Exception model
//!
//! Threads run in unprivileged Thread mode on the process stack (PSP).
//! Handlers run on the main stack (MSP). On exception entry the core stacks
//! r0-r3, r12, lr, pc and xPSR onto the PSP; on exception return it unstacks
//! them. The PendSV handler adds the missing half: r4-r11.
//!
//! # Priorities
//!
//! - SysTick: most urgent (default 0x00). Writes `pending_next`, pends PendSV.
//! - PendSV: least urgent (default 0xFF). Tail-chains after SysTick returns,
//!   so it always observes the `pending_next` that SysTick wrote.
//!
//! Threads must not touch the FPU: the handler returns with a basic-frame
//! EXC_RETURN and never saves s16-s31.

use ::cortex_m::peripheral::scb::SystemHandler;
use ::cortex_m::peripheral::syst::SystClkSource;
use ::cortex_m::peripheral::{SCB, SYST};

use super::Arch;
use crate::config::TickConfig;
use crate::errors::ThreadResult;
use crate::kprintln;
#[cfg(feature = "handlers")]
use crate::config::{CONTROL_UNPRIVILEGED, EXC_RETURN_THREAD_PSP};
#[cfg(feature = "handlers")]
use crate::sched::rr::{CURRENT_OFFSET, SCHEDULER};

/// ARMv7-M architecture implementation.
pub struct CortexM;

impl Arch for CortexM {
    #[inline]
    fn request_context_switch() {
        // ICSR.PENDSVSET
        SCB::set_pendsv();
    }

    fn enable_interrupts() {
        unsafe { ::cortex_m::interrupt::enable() };
    }

    fn disable_interrupts() {
        ::cortex_m::interrupt::disable();
    }

    fn interrupts_enabled() -> bool {
        ::cortex_m::register::primask::read().is_active()
    }

    fn wait_for_interrupt() {
        ::cortex_m::asm::wfi();
    }
}

/// Program SysTick as the scheduler tick and set both exception priorities.
///
/// Call with interrupts disabled, before `Scheduler::start`.
pub fn configure_tick(syst: &mut SYST, scb: &mut SCB, config: &TickConfig) -> ThreadResult<()> {
    let reload = config.validate()?;

    unsafe {
        scb.set_priority(SystemHandler::SysTick, config.tick_priority);
        scb.set_priority(SystemHandler::PendSV, config.switch_priority);
    }

    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();

    kprintln!(
        "[tick] {} Hz from {} Hz core clock, reload {}, SysTick prio {:#04x}, PendSV prio {:#04x}",
        config.tick_hz,
        config.core_clock_hz,
        reload,
        config.tick_priority,
        config.switch_priority
    );
    Ok(())
}

/// SysTick exception: advance the round-robin and pend the switch.
#[cfg(feature = "handlers")]
#[unsafe(no_mangle)]
pub extern "C" fn SysTick() {
    SCHEDULER.on_tick::<CortexM>();
}

/// PendSV exception: save the outgoing thread, load the incoming one.
///
/// The hardware has already stacked the outgoing thread's r0-r3, r12, lr,
/// pc and xPSR on its PSP. `current` is null only for the first switch, when
/// the interrupted code is `main` on the MSP and there is nothing to save.
///
/// # Safety
///
/// Entered by the NVIC only.
#[cfg(feature = "handlers")]
#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn PendSV() {
    core::arch::naked_asm!(
        "ldr   r1, ={sched}",
        "ldr   r2, [r1, #{current}]",
        "mrs   r0, psp",
        "cbz   r2, 2f",
        "stmdb r0!, {{r4-r11}}",
        "2:",
        // r0 in: outgoing saved sp (ignored on the first switch)
        // r0 out: incoming saved sp
        "bl    {switch}",
        "ldmia r0!, {{r4-r11}}",
        "msr   psp, r0",
        "movs  r1, #{control}",
        "msr   control, r1",
        "isb",
        "ldr   r0, ={exc_return}",
        "bx    r0",
        sched = sym SCHEDULER,
        current = const CURRENT_OFFSET,
        switch = sym pendsv_switch,
        control = const CONTROL_UNPRIVILEGED,
        exc_return = const EXC_RETURN_THREAD_PSP,
    );
}

#[cfg(feature = "handlers")]
unsafe extern "C" fn pendsv_switch(saved_sp: *mut u32) -> *mut u32 {
    unsafe { SCHEDULER.switch_context(saved_sp) }
}
