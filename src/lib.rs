//! Async пул воркеров фиксированного размера поверх tokio
//!
//! # Features
//! - Фиксированное число воркеров на общем канале задач
//! - Буферизация каналов задач и результатов (или синхронная передача)
//! - Режим без результатов: обработчик выполняется, результат отбрасывается
//! - Паники обработчика превращаются в `TaskError::Panicked`
//! - Graceful stop: задачи из очереди дорабатываются до закрытия потока результатов
//! - Метрики воркеров и задач

mod channel;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod task;

pub use errors::{PanicError, TaskError};
pub use handle::Results;
pub use model::{PoolMetrics, ResultDelivery};
pub use pool::{Config, Pool};
pub use result::TaskResult;
pub use task::Handler;
pub use tokio_util::sync::CancellationToken;
