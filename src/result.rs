use super::errors::TaskError;

/// Результат выполнения одной задачи
pub type TaskResult<V, E> = Result<V, TaskError<E>>;
