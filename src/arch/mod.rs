//! Architecture abstraction layer for switch requests and interrupt control.
//!
//! The scheduler core only needs one thing from the hardware at run time:
//! a way to arm the deferred, low-priority context switch exception. The
//! register save/restore itself is a naked handler in the port module.

/// Architecture abstraction trait.
///
/// Implemented by the ARMv7-M port and by the host-side exception model used
/// for testing.
pub trait Arch {
    /// Arm the deferred context switch exception.
    ///
    /// Must not run the switch synchronously: the handler executes later, once
    /// no higher-priority exception is active. Arming an already pending
    /// switch is a no-op.
    fn request_context_switch();

    /// Enable interrupts on the current CPU.
    fn enable_interrupts();

    /// Disable interrupts on the current CPU.
    fn disable_interrupts();

    /// Check if interrupts are currently enabled.
    fn interrupts_enabled() -> bool;

    /// Sleep until the next interrupt.
    fn wait_for_interrupt();
}

pub mod console;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod armv7m;

#[cfg(any(test, feature = "std-shim"))]
pub mod sim;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use armv7m::CortexM as DefaultArch;

#[cfg(all(
    not(all(target_arch = "arm", target_os = "none")),
    any(test, feature = "std-shim")
))]
pub use sim::SimArch as DefaultArch;

#[cfg(all(
    not(all(target_arch = "arm", target_os = "none")),
    not(any(test, feature = "std-shim"))
))]
compile_error!("This library targets bare-metal ARMv7-M. Use --target thumbv7m-none-eabi (or thumbv7em-none-eabi) or enable the std-shim feature for host testing.");

// Hard-float code sets CONTROL.FPCA, so exception entry stacks the extended
// frame. PendSV saves and returns with the basic frame only.
#[cfg(all(target_arch = "arm", target_os = "none", target_abi = "eabihf"))]
compile_error!("Threads must not use the FPU: build for thumbv7m-none-eabi or thumbv7em-none-eabi, not an eabihf target.");

/// Park the caller forever, sleeping between interrupts.
///
/// `main` calls this after `Scheduler::start`; the first context switch
/// abandons `main` and never comes back to it.
pub fn idle() -> ! {
    loop {
        DefaultArch::wait_for_interrupt();
    }
}
