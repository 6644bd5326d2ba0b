use std::future::Future;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A zero-argument asynchronous operation producing one value.
#[async_trait::async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn run(&self) -> Result<Self::Output, BoxError>;
}

/// Adapts a closure returning a future into a [`TaskRunner`].
pub struct FnRunner<F> {
    f: F,
}

impl<F> FnRunner<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait::async_trait]
impl<F, Fut, R, E> TaskRunner for FnRunner<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Output = R;

    async fn run(&self) -> Result<R, BoxError> {
        (self.f)().await.map_err(Into::into)
    }
}

/// Shorthand for [`FnRunner::new`].
pub fn task_fn<F>(f: F) -> FnRunner<F> {
    FnRunner::new(f)
}
