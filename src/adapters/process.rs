//! Subprocess execution with a deadline
//!
//! External tools are spawned with piped output and polled with
//! `try_wait`; a tool still running at the deadline is killed and reaped.

use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::warn;

use super::{AdapterError, Result};

/// Interval between exit checks
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `command` to completion, killing it if it outlives `timeout`
pub fn run_with_deadline(
    command: &mut Command,
    tool: &str,
    timeout: Option<Duration>,
) -> Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AdapterError::CommandFailed {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

    // Pipes are drained while waiting; a full pipe would stall the child
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => match wait_until(&mut child, Instant::now() + limit)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(tool, timeout_ms = limit.as_millis() as u64, "tool killed at deadline");
                return Err(AdapterError::Timeout(format!(
                    "{} exceeded {:.1}s",
                    tool,
                    limit.as_secs_f64()
                )));
            }
        },
    };

    Ok(Output {
        status,
        stdout: join_drain(stdout),
        stderr: join_drain(stderr),
    })
}

/// Poll until the child exits or the deadline passes (`None`)
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
