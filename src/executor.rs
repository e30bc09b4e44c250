use iced::executor;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Runs every in-flight backend call on one tokio runtime. Calls never block
/// each other; results come back to `update` as messages.
#[derive(Debug)]
pub struct TokioExecutor {
    runtime: Arc<Runtime>,
}

impl executor::Executor for TokioExecutor {
    fn new() -> Result<Self, std::io::Error> {
        let runtime = Builder::new_multi_thread()
            .thread_name("wallet-io")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    fn spawn(&self, future: impl std::future::Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(future);
    }

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.runtime.enter();
        f()
    }
}
