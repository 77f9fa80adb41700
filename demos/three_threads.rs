//! Three threads sharing one core, switched on every SysTick.
//!
//! Targets the LM3S6965 (QEMU `lm3s6965evb`):
//!
//! ```text
//! cargo run --example three_threads --features demo --target thumbv7m-none-eabi
//! ```

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use rr_threads::arch::{console, console::SemihostingSink, DefaultArch};
use rr_threads::{kprintln, ThreadStack, ThreadTable, TickConfig, SCHEDULER};

const STACK_WORDS: usize = 256;
const WORK_LOOPS: u32 = 200_000;

static THREADS: ThreadTable<3> = ThreadTable::new();
static STACK_1: ThreadStack<STACK_WORDS> = ThreadStack::new();
static STACK_2: ThreadStack<STACK_WORDS> = ThreadStack::new();
static STACK_3: ThreadStack<STACK_WORDS> = ThreadStack::new();

static CONSOLE: SemihostingSink = SemihostingSink::new();

fn busy_wait() {
    for _ in 0..WORK_LOOPS {
        cortex_m::asm::nop();
    }
}

fn run(name: &str) -> ! {
    let mut round: u32 = 0;
    loop {
        kprintln!("{} round {} on {:?}", name, round, rr_threads::current_thread());
        round = round.wrapping_add(1);
        busy_wait();
    }
}

fn thread_1() -> ! {
    run("T1")
}

fn thread_2() -> ! {
    run("T2")
}

fn thread_3() -> ! {
    run("T3")
}

#[entry]
fn main() -> ! {
    console::set_sink(&CONSOLE);

    let Some(mut cp) = cortex_m::Peripherals::take() else {
        panic!("core peripherals already taken");
    };

    let result = (|| {
        let first = THREADS.spawn(&STACK_1, thread_1)?;
        THREADS.spawn(&STACK_2, thread_2)?;
        THREADS.spawn(&STACK_3, thread_3)?;
        THREADS.link_in_order()?;

        rr_threads::configure_tick(&mut cp.SYST, &mut cp.SCB, &TickConfig::new(12_000_000, 100))?;
        SCHEDULER.start::<DefaultArch, 3>(&THREADS, first)
    })();

    if let Err(e) = result {
        kprintln!("setup failed: {}", e);
        panic!("setup failed");
    }

    rr_threads::idle()
}
