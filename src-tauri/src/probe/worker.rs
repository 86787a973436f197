//! A dedicated thread that answers one probe call at a time.
//!
//! Native handles that must stay on the thread that created them live inside
//! the worker. A caller whose previous request is still running is refused
//! instead of queued, and shutdown never waits longer than its timeout for a
//! call that is stuck in the platform API.
#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use log::{debug, warn};
use tokio::sync::oneshot;

use super::ProbeError;

type Reply = oneshot::Sender<Result<String, ProbeError>>;

pub const RELEASE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialWorker {
    name: String,
    requests: Option<mpsc::Sender<Reply>>,
    busy: Arc<AtomicBool>,
    // Disconnects once the worker thread has returned.
    exited: Option<mpsc::Receiver<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SerialWorker {
    /// Starts the thread and waits for `init` to finish on it.
    pub fn spawn<S, I, C>(name: &str, init: I, call: C) -> Result<Self, ProbeError>
    where
        S: 'static,
        I: FnOnce() -> Result<S, ProbeError> + Send + 'static,
        C: Fn(&S) -> Result<String, ProbeError> + Send + 'static,
    {
        let (requests, inbox) = mpsc::channel::<Reply>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), ProbeError>>(1);
        let (exited_tx, exited_rx) = mpsc::channel::<()>();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = Arc::clone(&busy);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let _exited = exited_tx;
                let state = match init() {
                    Ok(state) => {
                        let _ = ready_tx.send(Ok(()));
                        state
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                // Ends when the owner drops its sender.
                for reply in inbox {
                    let result = call(&state);
                    worker_busy.store(false, Ordering::Release);
                    let _ = reply.send(result);
                }
                debug!("{thread_name} worker exiting");
            })
            .map_err(|e| ProbeError::InitFailed(format!("failed to spawn {name} worker: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                name: name.to_string(),
                requests: Some(requests),
                busy,
                exited: Some(exited_rx),
                handle: Some(handle),
            }),
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => Err(ProbeError::InitFailed(format!(
                "{name} worker exited during startup"
            ))),
        }
    }

    pub fn sample(&self) -> BoxFuture<'static, Result<String, ProbeError>> {
        let Some(requests) = &self.requests else {
            return ready_err(format!("{} worker is not running", self.name));
        };
        if self.busy.swap(true, Ordering::AcqRel) {
            return ready_err(format!("{} worker is still answering the previous call", self.name));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if requests.send(reply_tx).is_err() {
            self.busy.store(false, Ordering::Release);
            return ready_err(format!("{} worker is not running", self.name));
        }

        let name = self.name.clone();
        Box::pin(async move {
            reply_rx
                .await
                .map_err(|_| ProbeError::CallFailed(format!("{name} worker dropped the request")))?
        })
    }

    /// Closes the request channel and waits up to `timeout` for the thread to
    /// return. A thread still stuck in a call is detached. Returns whether the
    /// thread was joined.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.requests.take();
        let (Some(exited), Some(handle)) = (self.exited.take(), self.handle.take()) else {
            return true;
        };

        match exited.recv_timeout(timeout) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "{} worker still busy after {timeout:?}; detaching it",
                    self.name
                );
                false
            }
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!("{} worker panicked during shutdown", self.name);
                }
                true
            }
        }
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        self.shutdown(RELEASE_TIMEOUT);
    }
}

fn ready_err(message: String) -> BoxFuture<'static, Result<String, ProbeError>> {
    Box::pin(future::ready(Err(ProbeError::CallFailed(message))))
}
