// Copyright 2024, The rust-ipfs-core Authors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! A fixed-size pool of tasks draining a bounded work queue (§4.8).
//!
//! Work items are boxed futures; the pool itself doesn't know what a `ConnectionWorker` is, it
//! just spawns whatever it's handed onto a bounded channel of `tokio` tasks, the way the
//! teacher's actor-style components pair a bounded `mpsc` with a spawned `run` loop.

use std::future::Future;

use tokio::sync::mpsc;

pub const TARGET: &str = "worker_pool";

type Job = Box<dyn FnOnce() -> BoxedFuture + Send>;
type BoxedFuture = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    #[error("worker pool queue is saturated")]
    Saturated,
}

/// Bounded pool of `capacity` concurrent workers. Submission never blocks the caller: a full
/// queue is reported as [`WorkerPoolError::Saturated`] so the Acceptor can close the new
/// connection immediately rather than stall the accept loop.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    _handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `capacity` worker tasks sharing one bounded queue.
    pub fn new(capacity: usize, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(queue_depth);
        let receiver = std::sync::Arc::new(tokio::sync::Mutex::new(receiver));

        let mut handles = Vec::with_capacity(capacity);
        for worker_id in 0..capacity {
            let receiver = receiver.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    match job {
                        Some(job) => job().await,
                        None => {
                            log::debug!(target: TARGET, "worker {worker_id} shutting down, queue closed");
                            break;
                        },
                    }
                }
            }));
        }

        Self { sender, _handles: handles }
    }

    /// Submits `fut` for execution. Fails immediately (without blocking) if the queue is full.
    pub fn try_submit<F, Fut>(&self, fut: F) -> Result<(), WorkerPoolError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::new(move || Box::pin(fut()));
        self.sender.try_send(job).map_err(|_| WorkerPoolError::Saturated)
    }

    /// Closes the submission queue and waits for in-flight + queued jobs to drain.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self._handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn runs_submitted_jobs() {
        let pool = WorkerPool::new(2, 8);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            pool.try_submit(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn full_queue_reports_saturation_without_blocking() {
        // A pool with one worker and a zero-depth queue: the worker picks up the first job
        // immediately (occupying the only execution slot), so the second submission lands on a
        // channel with no buffer and no ready receiver, which `try_send` reports as full.
        let pool = WorkerPool::new(1, 0);
        let gate = Arc::new(tokio::sync::Notify::new());
        pool.try_submit({
            let gate = gate.clone();
            move || async move { gate.notified().await }
        })
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let result = pool.try_submit(|| async {});
        assert!(matches!(result, Err(WorkerPoolError::Saturated)));
        gate.notify_one();
        pool.shutdown().await;
    }
}
