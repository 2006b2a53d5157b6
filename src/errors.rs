use std::{
    any::Any,
    backtrace::Backtrace,
};
use thiserror::Error;


/// Ошибка задачи: либо ошибка обработчика, либо перехваченная паника
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// Ошибка, которую вернул сам обработчик. Передается без изменений.
    #[error("{0}")]
    Handler(E),

    #[error(transparent)]
    Panicked(#[from] PanicError),
}

impl<E> TaskError<E> {
    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    pub fn as_handler(&self) -> Option<&E> {
        match self {
            TaskError::Handler(err) => Some(err),
            TaskError::Panicked(_) => None,
        }
    }

    pub fn into_handler(self) -> Option<E> {
        match self {
            TaskError::Handler(err) => Some(err),
            TaskError::Panicked(_) => None,
        }
    }

    pub fn as_panic(&self) -> Option<&PanicError> {
        match self {
            TaskError::Panicked(panic) => Some(panic),
            TaskError::Handler(_) => None,
        }
    }
}


/// Паника обработчика, превращенная в обычную ошибку.
/// Хранит сообщение паники и стек, снятый в момент перехвата.
#[derive(Debug, Clone, Error)]
#[error("recovered from panic: {message}")]
pub struct PanicError {
    message: String,
    backtrace: String,
}

impl PanicError {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Self {
            message,
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Стек снимается в точке перехвата (в воркере, внутри `Task::run`),
    /// а не в месте паники: кадров обработчика в нем нет.
    /// Чтобы получить стек места паники, установите свой `std::panic::set_hook`.
    #[inline]
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}
