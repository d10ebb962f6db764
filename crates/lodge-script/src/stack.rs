//! Stack budget for script execution.
//!
//! Parsing and evaluation are recursive, so source nesting and script
//! recursion turn directly into native stack use. Two things keep that bounded:
//!
//! - [`with_script_stack`] runs work on a thread whose stack size is known,
//!   whatever thread the host happens to call from.
//! - [`DepthGuard`] counts nested evaluation frames per thread, across every
//!   engine on that thread, and turns runaway nesting into a `RangeError`.

use crate::Error;
use std::cell::Cell;

/// Stack size of the thread scripts run on.
pub const SCRIPT_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Nested evaluation frames allowed on one thread.
pub const MAX_EVAL_DEPTH: usize = 1024;

thread_local! {
    static ON_SCRIPT_STACK: Cell<bool> = const { Cell::new(false) };
    static EVAL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Runs `f` on a thread with a [`SCRIPT_STACK_SIZE`] stack and waits for it.
///
/// Calls made from inside `f` run inline, so a module that loads another
/// module keeps using the same thread.
pub fn with_script_stack<T, F>(f: F) -> Result<T, Error>
where
    T: Send,
    F: FnOnce() -> Result<T, Error> + Send,
{
    if ON_SCRIPT_STACK.with(Cell::get) {
        return f();
    }

    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("lodge-script".to_string())
            .stack_size(SCRIPT_STACK_SIZE)
            .spawn_scoped(scope, move || {
                ON_SCRIPT_STACK.with(|on| on.set(true));
                f()
            })
            .map_err(Error::host)?;

        match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

/// One nested evaluation frame, released on drop.
pub(crate) struct DepthGuard(());

impl DepthGuard {
    pub(crate) fn enter() -> Result<Self, Error> {
        EVAL_DEPTH.with(|depth| {
            if depth.get() >= MAX_EVAL_DEPTH {
                return Err(Error::RangeError(
                    "Maximum call stack size exceeded".to_string(),
                ));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard(()))
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        EVAL_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_calls_run_inline() {
        let outer = with_script_stack(|| {
            let outer = std::thread::current().id();
            let inner = with_script_stack(|| Ok(std::thread::current().id()))?;
            Ok(outer == inner)
        })
        .unwrap();
        assert!(outer);
    }

    #[test]
    fn test_runs_off_the_calling_thread() {
        let caller = std::thread::current().id();
        let worker = with_script_stack(|| Ok(std::thread::current().id())).unwrap();
        assert_ne!(caller, worker);
    }

    #[test]
    fn test_errors_pass_through() {
        let err = with_script_stack::<(), _>(|| Err(Error::TypeError("nope".into()))).unwrap_err();
        assert!(matches!(err, Error::TypeError(msg) if msg == "nope"));
    }

    #[test]
    fn test_depth_guard_limit_and_release() {
        let mut guards = Vec::new();
        for _ in 0..MAX_EVAL_DEPTH {
            guards.push(DepthGuard::enter().unwrap());
        }
        assert!(matches!(DepthGuard::enter(), Err(Error::RangeError(_))));
        guards.pop();
        assert!(DepthGuard::enter().is_ok());
        guards.clear();
        assert_eq!(EVAL_DEPTH.with(Cell::get), 0);
    }
}
