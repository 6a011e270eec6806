//! Background presentation.
//!
//! Presenting can block on the compositor, so the recording thread hands surface textures to
//! a worker thread and only waits for the previous present right before acquiring the next
//! texture.

use crate::error::{OnyxError, Result};
use std::sync::mpsc;
use std::thread;

struct PresentJob<T> {
    item: T,
    done: mpsc::Sender<()>,
}

/// Completion handle of a submitted present.
#[must_use = "a pending present should be waited on before acquiring the next texture"]
pub struct PendingPresent {
    done: mpsc::Receiver<()>,
}

impl PendingPresent {
    fn completed() -> Self {
        let (sender, done) = mpsc::channel();
        let _ = sender.send(());
        Self { done }
    }

    /// Blocks until the present ran. Returns immediately if the worker is gone.
    pub fn wait(self) {
        let _ = self.done.recv();
    }

    /// Whether the present already ran.
    pub fn is_done(&self) -> bool {
        !matches!(self.done.try_recv(), Err(mpsc::TryRecvError::Empty))
    }
}

/// A thread running one present job at a time, in submission order.
pub struct PresentWorker<T: Send + 'static = wgpu::SurfaceTexture> {
    jobs: Option<mpsc::Sender<PresentJob<T>>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PresentWorker {
    /// A worker presenting surface textures.
    pub fn for_surface() -> Result<Self> {
        Self::spawn(wgpu::SurfaceTexture::present)
    }
}

impl<T: Send + 'static> PresentWorker<T> {
    /// Starts a worker calling `present` for every submitted item.
    pub fn spawn(mut present: impl FnMut(T) + Send + 'static) -> Result<Self> {
        let (jobs, receiver) = mpsc::channel::<PresentJob<T>>();
        let thread = thread::Builder::new()
            .name("onyx-present".to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    present(job.item);
                    let _ = job.done.send(());
                }
                log::debug!("present worker stopped");
            })
            .map_err(OnyxError::PresentWorker)?;

        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    /// Queues `item` for presentation.
    pub fn submit(&self, item: T) -> PendingPresent {
        let Some(jobs) = &self.jobs else {
            return PendingPresent::completed();
        };

        let (done, receiver) = mpsc::channel();
        if jobs.send(PresentJob { item, done }).is_err() {
            log::error!("present worker is gone, dropping frame");
            return PendingPresent::completed();
        }
        PendingPresent { done: receiver }
    }
}

impl<T: Send + 'static> Drop for PresentWorker<T> {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("present worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_presents_run_in_order() {
        let presented = Arc::new(Mutex::new(Vec::new()));
        let sink = presented.clone();
        let worker =
            PresentWorker::spawn(move |frame: u32| sink.lock().unwrap().push(frame)).unwrap();

        let pending: Vec<_> = (0..5).map(|frame| worker.submit(frame)).collect();
        for present in pending {
            present.wait();
        }

        assert_eq!(*presented.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_wait_joins_the_job() {
        let (release, gate) = mpsc::channel::<()>();
        let worker = PresentWorker::spawn(move |_: ()| {
            let _ = gate.recv();
        })
        .unwrap();

        let pending = worker.submit(());
        assert!(!pending.is_done());
        release.send(()).unwrap();
        pending.wait();
    }

    #[test]
    fn test_drop_drains_queued_jobs() {
        let presented = Arc::new(Mutex::new(0));
        let sink = presented.clone();
        let worker = PresentWorker::spawn(move |_: u8| *sink.lock().unwrap() += 1).unwrap();
        for _ in 0..3 {
            let _ = worker.submit(0);
        }
        drop(worker);
        assert_eq!(*presented.lock().unwrap(), 3);
    }
}
