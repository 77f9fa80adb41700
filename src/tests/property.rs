//! Property-based tests for verifying system invariants.

#[cfg(test)]
mod property_tests {
    use alloc::vec::Vec;

    use crate::arch::sim::Registers;
    use crate::tests::helpers::{Rig, SimpleRng};

    #[test]
    fn test_cycle_returns_to_first() {
        for n in 1..=6 {
            let mut rig = Rig::<8>::ring(n);
            rig.launch(rig.ids[0]);
            for _ in 0..n {
                rig.tick();
            }
            assert_eq!(rig.current(), Some(rig.ids[0]), "ring of {}", n);
            assert_eq!(rig.machine.switches(), n + 1);
        }
    }

    #[test]
    fn test_every_thread_runs_once_per_cycle() {
        let mut rng = SimpleRng::new(0x5EED);
        for _ in 0..20 {
            let n = rng.gen_range(1, 8) as usize;
            let first = rng.gen_range(0, n as u64) as usize;
            let mut rig = Rig::<8>::ring(n);
            rig.launch(rig.ids[first]);

            let mut seen = Vec::new();
            for _ in 0..n {
                seen.push(rig.current().unwrap().index());
                rig.tick();
            }
            // Round-robin from `first`, wrapping at the end of the table.
            let expected: Vec<usize> = (0..n).map(|k| (first + k) % n).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_random_registers_survive_cycles() {
        let mut rng = SimpleRng::new(42);
        for n in 1..=5 {
            let mut rig = Rig::<8>::ring(n);
            rig.launch(rig.ids[0]);

            let mut snapshots: Vec<Option<Registers>> = (0..n).map(|_| None).collect();
            for _ in 0..(n * 6) {
                let slot = rig.current().unwrap().index();
                if let Some(expected) = snapshots[slot] {
                    assert_eq!(rig.machine.regs, expected);
                }

                // Let the thread clobber every register before it is preempted.
                let mut regs = Registers::default();
                for r in regs.r.iter_mut() {
                    *r = rng.next_u32();
                }
                regs.lr = rng.next_u32();
                regs.pc = rng.next_u32() & !1;
                regs.xpsr = 0x0100_0000 | (rng.next_u32() & 0xF800_0000);
                rig.machine.regs = regs;
                snapshots[slot] = Some(regs);

                rig.tick();
                assert_eq!(
                    rig.machine.psp,
                    rig.stacks[rig.current().unwrap().index()].top()
                );
            }
        }
    }

    #[test]
    fn test_suspended_stacks_stay_untouched() {
        let mut rng = SimpleRng::new(7);
        let mut rig = Rig::<4>::ring(3);
        rig.launch(rig.ids[0]);

        for _ in 0..50 {
            let running = rig.current().unwrap().index();
            let before: Vec<_> = rig
                .ids
                .iter()
                .map(|id| rig.table.descriptor(*id).unwrap().saved_stack_pointer())
                .collect();

            rig.machine.regs = Registers::patterned(rng.next_u32());
            rig.tick();

            // Only the preempted thread's saved pointer moved.
            for (i, id) in rig.ids.iter().enumerate() {
                let after = rig.table.descriptor(*id).unwrap().saved_stack_pointer();
                if i != running {
                    assert_eq!(after, before[i]);
                }
            }
            // Painted region below the deepest frame is never written.
            for stack in &rig.stacks {
                assert!(stack.untouched_words() >= crate::config::MIN_STACK_WORDS);
            }
        }
    }
}
