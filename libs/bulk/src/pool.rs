use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use crossbeam::channel::{Sender, unbounded};

use crate::error::GenerateError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Job(Job),
    Shutdown,
}

/// Fixed set of long-lived generation threads fed from one FIFO job queue.
///
/// Every caller shares the same threads, so the number of generation
/// threads in the process never exceeds `size`, however many batches are in
/// flight. Jobs from concurrent batches interleave in submission order.
pub(crate) struct WorkerPool {
    sender: Sender<Message>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(size: usize) -> Result<Self, GenerateError> {
        let size = size.max(1);
        let (sender, receiver) = unbounded::<Message>();

        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("phonebook-gen-{id}"))
                .spawn(move || {
                    while let Ok(Message::Job(job)) = receiver.recv() {
                        // A panicking job drops its reply sender; the
                        // submitter sees the missing chunk. The thread lives on.
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!(worker = id, "generation job panicked");
                        }
                    }
                })
                .map_err(|e| GenerateError::Worker(format!("spawn worker {id}: {e}")))?;
            handles.push(handle);
        }

        tracing::debug!(size, "generation pool started");
        Ok(Self { sender, handles })
    }

    pub(crate) fn size(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn execute<F>(&self, f: F) -> Result<(), GenerateError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::Job(Box::new(f)))
            .map_err(|_| GenerateError::Worker("generation pool is shut down".into()))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for _ in &self.handles {
            let _ = self.sender.send(Message::Shutdown);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("generation worker exited abnormally");
            }
        }
    }
}
