use super::{
    channel::Receiver,
    result::TaskResult,
};
use futures::stream::{self, Stream};


/// Handle на поток результатов пула.
///
/// Клоны делят один канал: каждый результат получит ровно один из них.
/// Поток закрывается после полной остановки пула, а в режиме
/// `ResultDelivery::Discard` закрыт с самого начала.
pub struct Results<V, E> {
    receiver: Receiver<TaskResult<V, E>>,
}

impl<V, E> Clone for Results<V, E> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}

impl<V, E> Results<V, E> {
    pub(crate) fn new(receiver: Receiver<TaskResult<V, E>>) -> Self {
        Self { receiver }
    }

    /// Следующий результат или `None`, если поток закрыт и пуст
    #[inline]
    pub async fn recv(&self) -> Option<TaskResult<V, E>> {
        self.receiver.recv().await
    }

    /// Собирает все результаты до закрытия потока.
    /// Завершится только после `Pool::stop`, поэтому `stop` должен выполняться в другой задаче.
    pub async fn drain(self) -> Vec<TaskResult<V, E>> {
        let mut results = Vec::new();
        while let Some(result) = self.recv().await {
            results.push(result);
        }
        results
    }

    pub fn into_stream(self) -> impl Stream<Item = TaskResult<V, E>> {
        stream::unfold(self, |results| async move {
            let next = results.recv().await?;
            Some((next, results))
        })
    }
}
