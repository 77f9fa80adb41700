//! Unit tests for setup validation and logging.

#[cfg(test)]
mod table_tests {
    use crate::arch::sim::SimArch;
    use crate::config::MIN_STACK_WORDS;
    use crate::errors::{ScheduleError, SpawnError, ThreadError};
    use crate::sched::Scheduler;
    use crate::tests::helpers::{leak_stack, leak_table, worker_a, Rig, TEST_STACK_WORDS};
    use crate::thread::ThreadId;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let rig = Rig::<4>::spawned(3);
        assert_eq!(rig.ids, [ThreadId::new(0), ThreadId::new(1), ThreadId::new(2)]);
        assert_eq!(rig.table.len(), 3);
        assert_eq!(rig.table.capacity(), 4);

        for (id, stack) in rig.ids.iter().zip(&rig.stacks) {
            let desc = rig.table.descriptor(*id).expect("Missing descriptor");
            assert!(desc.is_initialized());
            assert_eq!(desc.next(), None);
            assert!(stack.is_claimed());
        }
        assert!(rig.table.descriptor(ThreadId::new(3)).is_none());
    }

    #[test]
    fn test_spawn_rejects_small_stack() {
        let table = leak_table::<2>();
        let result = table.spawn(leak_stack::<16>(), worker_a);
        assert_eq!(
            result,
            Err(ThreadError::Spawn(SpawnError::StackTooSmall {
                words: 16,
                min: MIN_STACK_WORDS
            }))
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_spawn_rejects_misaligned_stack() {
        let table = leak_table::<2>();
        let stack = leak_stack::<63>();
        assert!(matches!(
            table.spawn(stack, worker_a),
            Err(ThreadError::Spawn(SpawnError::StackMisaligned(_)))
        ));
        assert!(!stack.is_claimed());
    }

    #[test]
    fn test_spawn_table_full() {
        let table = leak_table::<1>();
        table
            .spawn(leak_stack::<TEST_STACK_WORDS>(), worker_a)
            .expect("Failed to spawn thread");

        let spare = leak_stack::<TEST_STACK_WORDS>();
        assert_eq!(
            table.spawn(spare, worker_a),
            Err(ThreadError::Spawn(SpawnError::TableFull))
        );
        assert!(!spare.is_claimed());
    }

    #[test]
    fn test_spawn_stack_in_use() {
        let table = leak_table::<2>();
        let stack = leak_stack::<TEST_STACK_WORDS>();
        table.spawn(stack, worker_a).expect("Failed to spawn thread");
        assert_eq!(
            table.spawn(stack, worker_a),
            Err(ThreadError::Spawn(SpawnError::StackInUse))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_link_unknown_thread() {
        let rig = Rig::<4>::spawned(2);
        assert_eq!(
            rig.table.link(ThreadId::new(0), ThreadId::new(2)),
            Err(ThreadError::Schedule(ScheduleError::InvalidThread(ThreadId::new(2))))
        );
        assert_eq!(
            rig.table.link(ThreadId::new(3), ThreadId::new(0)),
            Err(ThreadError::Schedule(ScheduleError::InvalidThread(ThreadId::new(3))))
        );
    }

    #[test]
    fn test_ring_validation() {
        let empty = leak_table::<2>();
        assert_eq!(
            empty.ring_len(ThreadId::new(0)),
            Err(ThreadError::Schedule(ScheduleError::EmptyRing))
        );
        assert_eq!(
            empty.link_in_order(),
            Err(ThreadError::Schedule(ScheduleError::EmptyRing))
        );

        let rig = Rig::<4>::spawned(3);
        let [t0, t1, t2] = [rig.ids[0], rig.ids[1], rig.ids[2]];
        assert_eq!(
            rig.table.ring_len(t0),
            Err(ThreadError::Schedule(ScheduleError::NotLinked(t0)))
        );
        assert_eq!(
            rig.table.ring_len(ThreadId::new(3)),
            Err(ThreadError::Schedule(ScheduleError::InvalidThread(ThreadId::new(3))))
        );

        // 0 -> 1 -> 2 -> 1: never returns to 0
        rig.table.link(t0, t1).unwrap();
        rig.table.link(t1, t2).unwrap();
        rig.table.link(t2, t1).unwrap();
        assert_eq!(
            rig.table.ring_len(t0),
            Err(ThreadError::Schedule(ScheduleError::BrokenRing(t0)))
        );
        // ...but 1 and 2 form a valid ring on their own
        assert_eq!(rig.table.ring_len(t1), Ok(2));

        rig.table.link(t2, t0).unwrap();
        assert_eq!(rig.table.ring_len(t0), Ok(3));
    }

    #[test]
    fn test_self_ring() {
        let rig = Rig::<2>::spawned(1);
        rig.table.link_in_order().unwrap();
        assert_eq!(rig.table.descriptor(rig.ids[0]).unwrap().next(), Some(rig.ids[0]));
        assert_eq!(rig.table.ring_len(rig.ids[0]), Ok(1));
    }

    #[test]
    fn test_start_seals_table() {
        let mut rig = Rig::<4>::ring(2);
        rig.start(rig.ids[0]);
        assert!(rig.table.is_sealed());
        assert!(rig.sched.is_started());

        assert_eq!(
            rig.table.spawn(leak_stack::<TEST_STACK_WORDS>(), worker_a),
            Err(ThreadError::Spawn(SpawnError::AlreadyStarted))
        );
        assert_eq!(
            rig.table.link(rig.ids[1], rig.ids[1]),
            Err(ThreadError::Schedule(ScheduleError::AlreadyStarted))
        );
        assert_eq!(
            rig.sched.start::<SimArch, 4>(rig.table, rig.ids[0]),
            Err(ThreadError::Schedule(ScheduleError::AlreadyStarted))
        );

        // A second scheduler cannot take a sealed table either.
        let other = Scheduler::new();
        assert_eq!(
            other.start::<SimArch, 4>(rig.table, rig.ids[0]),
            Err(ThreadError::Schedule(ScheduleError::AlreadyStarted))
        );
        assert!(!other.is_started());
    }

    #[test]
    fn test_failed_start_leaves_scheduler_idle() {
        let rig = Rig::<4>::spawned(2);
        assert_eq!(
            rig.sched.start::<SimArch, 4>(rig.table, rig.ids[0]),
            Err(ThreadError::Schedule(ScheduleError::NotLinked(rig.ids[0])))
        );
        assert!(!rig.sched.is_started());
        assert!(!rig.table.is_sealed());
        assert_eq!(rig.sched.pending_thread(), None);
    }

    #[test]
    fn test_spawn_paints_below_frame() {
        let rig = Rig::<2>::spawned(1);
        let stack = rig.stacks[0];
        assert_eq!(
            stack.untouched_words(),
            TEST_STACK_WORDS - crate::config::CONTEXT_FRAME_WORDS
        );
    }
}

#[cfg(test)]
mod console_tests {
    extern crate std;

    use alloc::string::String;
    use std::thread::{self, ThreadId};

    use crate::arch::console::{self, ConsoleSink};
    use crate::tests::helpers::Rig;

    /// Keeps only what the installing test thread prints; other tests log
    /// concurrently through the same global sink.
    struct CaptureSink {
        owner: spin::Once<ThreadId>,
        log: spin::Mutex<String>,
    }

    impl ConsoleSink for CaptureSink {
        fn write_str(&self, s: &str) {
            if self.owner.get() == Some(&thread::current().id()) {
                self.log.lock().push_str(s);
            }
        }
    }

    static CAPTURE: CaptureSink = CaptureSink {
        owner: spin::Once::new(),
        log: spin::Mutex::new(String::new()),
    };

    #[test]
    fn test_setup_is_logged() {
        CAPTURE.owner.call_once(|| thread::current().id());
        assert!(console::set_sink(&CAPTURE));
        assert!(console::has_sink());
        assert!(!console::set_sink(&CAPTURE));

        let mut rig = Rig::<4>::ring(3);
        rig.start(rig.ids[0]);

        let log = CAPTURE.log.lock();
        assert!(log.contains("[sched] thread 2 ready: stack 0x"));
        assert!(log.contains("[sched] starting round-robin: 3 of 3 threads on the ring, first = 0\n"));
    }
}
