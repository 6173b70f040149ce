use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Fixed-size pool of execution slots for delegated jobs.
///
/// `try_spawn` either takes a free slot or hands the work back so the caller can run it
/// itself. `spawn_when_free` parks the work on its own task until a slot opens.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: TaskTracker,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool with `size` execution slots.
    ///
    /// # Arguments
    /// * `size` - Number of jobs allowed to run at once. Clamped to at least 1.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tasks: TaskTracker::new(),
            size,
        }
    }

    /// Spawns `work` on a free worker, or returns it untouched when all are busy.
    pub fn try_spawn<F>(&self, work: F) -> Result<(), F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.permits.clone().try_acquire_owned() {
            Ok(permit) => {
                self.tasks.spawn(async move {
                    // Held until the work ends, unwinding included.
                    let _permit = permit;
                    work.await;
                });
                Ok(())
            }
            Err(_) => Err(work),
        }
    }

    /// Spawns `work` to run as soon as a worker frees up. Never blocks the caller.
    pub fn spawn_when_free<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.tasks.spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            work.await;
        });
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers currently idle.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Resolves once every running or parked job has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
