//! Ограниченный канал с несколькими получателями поверх `tokio::sync::mpsc`.
//!
//! Емкость 0 означает рендеву: `send` завершается только после того,
//! как какой-либо получатель забрал элемент. Если `send` отменен раньше,
//! элемент забирается обратно и никому не достается.

use std::sync::{
    Arc,
    Mutex as StdMutex,
    MutexGuard,
};
use tokio::sync::{
    mpsc::{self, error::SendError},
    oneshot,
    Mutex,
};


type Slot<T> = Arc<StdMutex<Option<T>>>;

fn safe_lock<T>(m: &StdMutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[inline]
fn take<T>(slot: &Slot<T>) -> Option<T> {
    safe_lock(slot).take()
}

enum Envelope<T> {
    Buffered(T),
    Handoff {
        slot: Slot<T>,
        delivered: oneshot::Sender<()>,
    },
}

impl<T> Envelope<T> {
    fn into_item(self) -> Option<T> {
        match self {
            Envelope::Buffered(item) => Some(item),
            Envelope::Handoff { slot, .. } => take(&slot),
        }
    }
}

/// Забирает элемент из слота, если `send` был отменен до передачи
struct Retract<T> {
    slot: Slot<T>,
}

impl<T> Drop for Retract<T> {
    fn drop(&mut self) {
        drop(take(&self.slot));
    }
}

pub(crate) struct Sender<T> {
    inner: mpsc::Sender<Envelope<T>>,
    rendezvous: bool,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            rendezvous: self.rendezvous,
        }
    }
}

pub(crate) struct Receiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Sender {
            inner: tx,
            rendezvous: capacity == 0,
        },
        Receiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Канал, закрытый с момента создания: `recv` сразу возвращает `None`
pub(crate) fn closed<T>() -> Receiver<T> {
    let (_, rx) = bounded(1);
    rx
}

impl<T> Sender<T> {
    pub(crate) async fn send(&self, item: T) -> Result<(), SendError<T>> {
        if !self.rendezvous {
            return match self.inner.send(Envelope::Buffered(item)).await {
                Ok(()) => Ok(()),
                Err(SendError(envelope)) => match envelope.into_item() {
                    Some(item) => Err(SendError(item)),
                    None => Ok(()),
                },
            };
        }

        let slot: Slot<T> = Arc::new(StdMutex::new(Some(item)));
        let _retract = Retract { slot: slot.clone() };
        let (tx, rx) = oneshot::channel();

        let queued = self
            .inner
            .send(Envelope::Handoff {
                slot: slot.clone(),
                delivered: tx,
            })
            .await;
        if queued.is_ok() {
            // Err здесь значит, что получатель был уничтожен вместе с буфером
            let _ = rx.await;
        }

        // элемент остался в слоте: ни один получатель его не взял
        match take(&slot) {
            Some(item) => Err(SendError(item)),
            None => Ok(()),
        }
    }
}

impl<T> Receiver<T> {
    pub(crate) async fn recv(&self) -> Option<T> {
        loop {
            let envelope = self.inner.lock().await.recv().await?;
            match envelope {
                Envelope::Buffered(item) => return Some(item),
                Envelope::Handoff { slot, delivered } => {
                    // пустой слот: отправитель отменил send, пропускаем
                    if let Some(item) = take(&slot) {
                        let _ = delivered.send(());
                        return Some(item);
                    }
                }
            }
        }
    }
}
