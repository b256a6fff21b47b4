//! Runtime abstraction layer for async operations
//!
//! The session never reaches for a global executor: it is handed an
//! [`AsyncSpawner`] and runs its background reads and lookups through it.

use crate::prelude::{Arc, Future, Pin};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxFuture) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawns a typed future on `spawner`
pub fn spawn<F>(spawner: &dyn AsyncSpawner, future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawner.spawn_boxed(Box::pin(future))
}

/// Reads a whole file without blocking the async executor where possible
pub async fn read_file(path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
    #[cfg(feature = "tokio-runtime")]
    {
        tokio::fs::read(path.as_ref()).await
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        std::fs::read(path.as_ref())
    }
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;
        use ::tokio::task::JoinHandle;

        /// Spawns onto a tokio runtime, from inside or outside of it
        #[derive(Clone)]
        pub struct TokioSpawner {
            handle: Handle,
        }

        impl TokioSpawner {
            pub fn new(handle: Handle) -> Self {
                Self { handle }
            }

            /// Spawner for the runtime the caller is running on
            pub fn current() -> Option<Self> {
                Handle::try_current().ok().map(Self::new)
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxFuture) -> Box<dyn AsyncHandle> {
                Box::new(TokioHandle(self.handle.spawn(future)))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    /// Runs each future to completion on its own OS thread.
    ///
    /// For hosts without a tokio runtime; tasks cannot be cancelled.
    #[derive(Clone, Copy, Default)]
    pub struct ThreadSpawner;

    impl AsyncSpawner for ThreadSpawner {
        fn spawn_boxed(&self, future: BoxFuture) -> Box<dyn AsyncHandle> {
            let finished = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&finished);
            std::thread::spawn(move || {
                futures::executor::block_on(future);
                flag.store(true, Ordering::SeqCst);
            });
            Box::new(ThreadHandle { finished })
        }
    }

    struct ThreadHandle {
        finished: Arc<AtomicBool>,
    }

    impl AsyncHandle for ThreadHandle {
        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }

        fn cancel(&self) {
            log::debug!("thread tasks run to completion; cancel ignored");
        }
    }
}

#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;
pub use spawners::ThreadSpawner;
