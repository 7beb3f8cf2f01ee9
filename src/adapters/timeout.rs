//! Timeout guard for blocking adapter calls

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use super::{AdapterError, Result};

/// Run `call` with an upper bound on its wall time.
///
/// With `timeout == None` the call runs inline. Otherwise it runs on a
/// detached worker thread; on expiry the worker is abandoned and
/// [`AdapterError::Timeout`] is returned. A panic inside `call` becomes
/// [`AdapterError::WorkerPanicked`] either way.
pub fn call_with_timeout<T, F>(what: &str, timeout: Option<Duration>, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let Some(limit) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| {
            warn!(adapter = what, "adapter call panicked");
            Err(AdapterError::WorkerPanicked(what.to_string()))
        });
    };

    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name(format!("adapter-{}", what))
        .spawn(move || {
            // The receiver is gone if we already timed out
            let _ = tx.send(call());
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(adapter = what, timeout_ms = limit.as_millis() as u64, "adapter call timed out");
            Err(AdapterError::Timeout(format!(
                "{} exceeded {:.1}s",
                what,
                limit.as_secs_f64()
            )))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!(adapter = what, "adapter call panicked");
            Err(AdapterError::WorkerPanicked(what.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_timeout_runs_inline() {
        let value = call_with_timeout("inline", None, || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_fast_call_completes() {
        let value =
            call_with_timeout("fast", Some(Duration::from_secs(5)), || Ok("done")).unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn test_error_is_propagated() {
        let result: Result<()> = call_with_timeout("failing", Some(Duration::from_secs(5)), || {
            Err(AdapterError::MalformedOutput("bad".into()))
        });
        assert!(matches!(result, Err(AdapterError::MalformedOutput(_))));
    }

    #[test]
    fn test_slow_call_times_out() {
        let result: Result<()> = call_with_timeout("slow", Some(Duration::from_millis(20)), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert!(matches!(result, Err(AdapterError::Timeout(_))));
    }

    #[test]
    fn test_panicking_call_is_reported() {
        let result: Result<()> =
            call_with_timeout("panics", Some(Duration::from_secs(5)), || panic!("boom"));
        assert!(matches!(result, Err(AdapterError::WorkerPanicked(_))));
    }

    #[test]
    fn test_inline_panic_is_reported() {
        let result: Result<()> = call_with_timeout("panics", None, || panic!("boom"));
        assert!(matches!(result, Err(AdapterError::WorkerPanicked(w)) if w == "panics"));
    }
}
