use super::{
    errors::{PanicError, TaskError},
    result::TaskResult,
};
use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};
use futures::{
    future::BoxFuture,
    FutureExt,
};
use tokio_util::sync::CancellationToken;


/// Пользовательский обработчик задач.
///
/// Реализован для любого замыкания `Fn(CancellationToken, T) -> Future<Output = Result<V, E>>`.
/// Токен отмены пул не проверяет: реагировать на него должен сам обработчик.
pub trait Handler<T, V, E>: Send + Sync + 'static {
    type Future: Future<Output = Result<V, E>> + Send + 'static;

    fn call(&self, ctx: CancellationToken, item: T) -> Self::Future;
}

impl<T, V, E, F, Fut> Handler<T, V, E> for F
where
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    type Future = Fut;

    #[inline]
    fn call(&self, ctx: CancellationToken, item: T) -> Fut {
        self(ctx, item)
    }
}


pub(crate) type BoxHandler<T, V, E> =
    Arc<dyn Fn(CancellationToken, T) -> BoxFuture<'static, Result<V, E>> + Send + Sync>;

pub(crate) fn boxed<T, V, E, H>(handler: H) -> BoxHandler<T, V, E>
where
    T: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
    H: Handler<T, V, E>,
{
    let handler = Arc::new(handler);
    Arc::new(move |ctx: CancellationToken, item: T| {
        let handler = Arc::clone(&handler);
        // вызов внутри async, чтобы паника при создании future тоже была перехвачена
        async move { handler.call(ctx, item).await }.boxed()
    })
}


/// Задача: контекст отмены и данные для обработчика
pub(crate) struct Task<T> {
    ctx: CancellationToken,
    data: T,
}

impl<T> Task<T> {
    #[inline]
    pub(crate) fn new(ctx: CancellationToken, data: T) -> Self {
        Self { ctx, data }
    }

    /// Выполняет обработчик ровно один раз. Паника превращается в `TaskError::Panicked`.
    pub(crate) async fn run<V, E>(self, handler: &BoxHandler<T, V, E>) -> TaskResult<V, E> {
        let Task { ctx, data } = self;

        match AssertUnwindSafe(async move { (**handler)(ctx, data).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError::Handler(err)),
            Err(payload) => Err(TaskError::Panicked(PanicError::from_payload(payload))),
        }
    }
}
