#[cfg(feature = "loom")]
#[cfg(test)]
mod lock_model {
    use std::sync::Arc;

    use loom::thread::spawn;

    use crate::{Lock, Permit};

    const OP1: Permit = Permit::new(11111);
    const OP2: Permit = Permit::new(22222);

    #[test]
    fn exclusive_handoff() {
        loom::model(|| {
            let lock = Arc::new(Lock::new());
            lock.lock_exclusive(OP1).unwrap();
            let lock_clone = lock.clone();
            let thread = spawn(move || {
                lock_clone.lock_exclusive(OP2).unwrap();
                lock_clone.unlock_exclusive(OP2).unwrap();
            });
            lock.unlock_exclusive(OP1).unwrap();
            assert!(thread.join().is_ok());
        });
    }

    #[test]
    fn shared_handoff() {
        loom::model(|| {
            let lock = Arc::new(Lock::new());
            lock.lock_exclusive(OP1).unwrap();
            let lock_clone = lock.clone();
            let thread = spawn(move || {
                lock_clone.lock_shared(OP2).unwrap();
                lock_clone.unlock_shared(OP2).unwrap();
            });
            lock.unlock_exclusive(OP1).unwrap();
            assert!(thread.join().is_ok());
        });
    }

    #[test]
    fn exclusive_waits_for_shared() {
        loom::model(|| {
            let lock = Arc::new(Lock::new());
            lock.lock_shared(OP1).unwrap();
            let lock_clone = lock.clone();
            let thread = spawn(move || {
                lock_clone.lock_exclusive(OP2).unwrap();
                lock_clone.unlock_exclusive(OP2).unwrap();
            });
            lock.unlock_shared(OP1).unwrap();
            assert!(thread.join().is_ok());
        });
    }

    #[test]
    fn probe_sees_no_availability_under_any_holder() {
        loom::model(|| {
            let lock = Arc::new(Lock::new());
            lock.lock_exclusive(OP1).unwrap();
            let lock_clone = lock.clone();
            let thread = spawn(move || {
                assert_eq!(lock_clone.try_lock_exclusive(OP2), Ok(false));
            });
            assert!(thread.join().is_ok());
            lock.lock_exclusive(OP1).unwrap();
            lock.unlock_exclusive(OP1).unwrap();
            lock.unlock_exclusive(OP1).unwrap();
        });
    }
}
