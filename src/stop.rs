//! Run termination: a shared stop flag and the two strategies that set it.
//!
//! Exactly one strategy runs per monitoring session. The timed strategy
//! sleeps for the requested duration; the manual strategy waits for the
//! operator to press ENTER. Either way the flag goes from unset to set once
//! and is never reset.

use crate::error::{MonitorError, Result};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Termination flag shared between a stop strategy and the sample loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns true only for the caller that actually
    /// performed the transition.
    pub fn trigger(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How the run is ended; fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStrategy {
    /// Stop once this much time has passed.
    Timed(Duration),
    /// Stop when the operator sends a line (or closes) on the input channel.
    Manual,
}

/// What the strategy task did before it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The strategy set the signal itself.
    Fired,
    /// The signal was already set by someone else when the strategy fired.
    AlreadyStopped,
    /// Shutdown abandoned the strategy before it fired.
    Cancelled,
}

/// Owns the running stop strategy.
pub struct StopController {
    handle: JoinHandle<StopOutcome>,
    cancel: oneshot::Sender<()>,
}

impl StopController {
    /// Starts `strategy` against `signal`. The manual strategy reads one
    /// line from `input` on a dedicated thread, since a blocking read cannot
    /// be interrupted; the thread is left behind if the run ends first.
    ///
    /// Fails if that thread cannot be started, as the run would then have no
    /// way to be stopped.
    pub fn spawn<R>(strategy: StopStrategy, signal: StopSignal, input: R) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn_with(strategy, signal, input, thread::Builder::new().name("stop-input".into()))
    }

    fn spawn_with<R>(strategy: StopStrategy, signal: StopSignal, input: R, reader: thread::Builder) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (cancel, cancelled) = oneshot::channel();

        let handle = match strategy {
            StopStrategy::Timed(duration) => tokio::spawn(timed(duration, signal, cancelled)),
            StopStrategy::Manual => {
                let (line_tx, line_rx) = oneshot::channel();
                reader
                    .spawn(move || {
                        let _ = line_tx.send(wait_for_line(input));
                    })
                    .map_err(MonitorError::StopInput)?;
                tokio::spawn(manual(line_rx, signal, cancelled))
            }
        };

        Ok(Self { handle, cancel })
    }

    /// Ends the strategy after the sample loop has returned.
    ///
    /// A strategy still waiting is cancelled after forcing the signal, then
    /// given at most `grace` to exit. Returns `None` if it did not exit in
    /// time.
    pub async fn shutdown(self, signal: &StopSignal, grace: Duration) -> Option<StopOutcome> {
        let Self { mut handle, cancel } = self;

        if !handle.is_finished() {
            if signal.trigger() {
                tracing::debug!("Stop signal forced during shutdown");
            }
            let _ = cancel.send(());
        }

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Stop strategy task failed");
                None
            }
            Err(_) => {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "Stop strategy did not exit in time");
                handle.abort();
                None
            }
        }
    }
}

fn fire(signal: &StopSignal, why: &str) -> StopOutcome {
    if signal.trigger() {
        tracing::info!("{why}, stopping");
        StopOutcome::Fired
    } else {
        StopOutcome::AlreadyStopped
    }
}

async fn timed(
    duration: Duration,
    signal: StopSignal,
    cancelled: oneshot::Receiver<()>,
) -> StopOutcome {
    tokio::select! {
        _ = tokio::time::sleep(duration) => fire(&signal, "Duration elapsed"),
        _ = cancelled => StopOutcome::Cancelled,
    }
}

async fn manual(
    line: oneshot::Receiver<io::Result<()>>,
    signal: StopSignal,
    mut cancelled: oneshot::Receiver<()>,
) -> StopOutcome {
    tokio::select! {
        received = line => match received {
            Ok(Ok(())) => fire(&signal, "Stop requested by operator"),
            Ok(Err(e)) => {
                // Unreadable input must not end the run by itself
                tracing::warn!(error = %e, "Failed to read stop input");
                let _ = (&mut cancelled).await;
                StopOutcome::Cancelled
            }
            Err(_) => {
                let _ = (&mut cancelled).await;
                StopOutcome::Cancelled
            }
        },
        _ = &mut cancelled => StopOutcome::Cancelled,
    }
}

/// Blocks until a full line or end of input arrives.
fn wait_for_line<R: BufRead>(mut input: R) -> io::Result<()> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::time::Instant;

    /// Input that never yields a line, like an idle terminal.
    struct Blocking(std::sync::mpsc::Receiver<()>);

    impl Read for Blocking {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    fn idle_input() -> (io::BufReader<Blocking>, std::sync::mpsc::Sender<()>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (io::BufReader::new(Blocking(rx)), tx)
    }

    #[test]
    fn signal_sets_once() {
        let signal = StopSignal::new();
        let other = signal.clone();
        assert!(!signal.is_set());
        assert!(other.trigger());
        assert!(!signal.trigger());
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn timed_fires_no_earlier_than_duration() {
        let signal = StopSignal::new();
        let start = Instant::now();
        let controller = StopController::spawn(
            StopStrategy::Timed(Duration::from_millis(80)),
            signal.clone(),
            Cursor::new(Vec::new()),
        )
        .unwrap();

        while !signal.is_set() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(start.elapsed() >= Duration::from_millis(80));

        let outcome = controller.shutdown(&signal, Duration::from_secs(1)).await;
        assert_eq!(outcome, Some(StopOutcome::Fired));
    }

    #[tokio::test]
    async fn timed_is_cancelled_by_shutdown() {
        let signal = StopSignal::new();
        let controller = StopController::spawn(
            StopStrategy::Timed(Duration::from_secs(3600)),
            signal.clone(),
            Cursor::new(Vec::new()),
        )
        .unwrap();

        let outcome = controller.shutdown(&signal, Duration::from_secs(1)).await;
        assert_eq!(outcome, Some(StopOutcome::Cancelled));
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn manual_fires_on_enter() {
        let signal = StopSignal::new();
        let controller = StopController::spawn(
            StopStrategy::Manual,
            signal.clone(),
            Cursor::new(b"\n".to_vec()),
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !signal.is_set() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("operator stop never arrived");

        let outcome = controller.shutdown(&signal, Duration::from_secs(1)).await;
        assert_eq!(outcome, Some(StopOutcome::Fired));
    }

    #[tokio::test]
    async fn manual_wait_is_abandoned_within_grace() {
        let signal = StopSignal::new();
        let (input, _keep_blocked) = idle_input();
        let controller = StopController::spawn(StopStrategy::Manual, signal.clone(), input).unwrap();

        let start = Instant::now();
        let outcome = controller.shutdown(&signal, Duration::from_millis(500)).await;

        assert_eq!(outcome, Some(StopOutcome::Cancelled));
        assert!(signal.is_set());
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn late_operator_stop_does_not_set_twice() {
        let signal = StopSignal::new();
        assert!(signal.trigger());

        let controller = StopController::spawn(
            StopStrategy::Manual,
            signal.clone(),
            Cursor::new(b"\n".to_vec()),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = controller.shutdown(&signal, Duration::from_secs(1)).await;
        assert!(matches!(
            outcome,
            Some(StopOutcome::AlreadyStopped) | Some(StopOutcome::Cancelled)
        ));
    }

    // A stack larger than the address space makes thread creation fail
    #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
    #[tokio::test]
    async fn manual_fails_when_reader_cannot_start() {
        let signal = StopSignal::new();
        let reader = thread::Builder::new().stack_size(1 << 48);

        let result = StopController::spawn_with(
            StopStrategy::Manual,
            signal.clone(),
            Cursor::new(b"\n".to_vec()),
            reader,
        );

        assert!(matches!(result, Err(MonitorError::StopInput(_))));
        assert!(!signal.is_set());
    }
}
