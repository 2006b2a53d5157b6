use super::{
    channel::{self, Receiver, Sender},
    errors::TaskError,
    handle::Results,
    model::{PoolMetrics, ResultDelivery},
    result::TaskResult,
    task::{self, BoxHandler, Handler, Task},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;


/// Конфигурация пула воркеров
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub worker_count: usize,
    pub task_buffer_size: usize,
    pub result_delivery: ResultDelivery,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 3,
            task_buffer_size: 0,
            result_delivery: ResultDelivery::Buffered(0),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            worker_count: num_cpus,
            task_buffer_size: num_cpus * 2,
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            worker_count: num_cpus * 2,
            task_buffer_size: num_cpus * 8,
            ..Default::default()
        }
    }

    /// Паникует при `n == 0`: такую ошибку нельзя исправить повтором
    pub fn with_worker_count(mut self, n: usize) -> Self {
        assert!(n > 0, "number of workers must be positive");
        self.worker_count = n;
        self
    }

    pub fn with_task_buffer_size(mut self, size: usize) -> Self {
        self.task_buffer_size = size;
        self
    }

    pub fn with_result_buffer_size(mut self, size: usize) -> Self {
        self.result_delivery = ResultDelivery::Buffered(size);
        self
    }

    pub fn discard_results(mut self) -> Self {
        self.result_delivery = ResultDelivery::Discard;
        self
    }
}


#[inline(always)]
fn unlikely(b: bool) -> bool {
    #[cold]
    fn cold() {}
    if !b { cold() }
    b
}

#[derive(Default)]
struct Counters {
    active_workers: AtomicUsize,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
    panicked_tasks: AtomicUsize,
    all_workers_exited: Notify,
}

impl Counters {
    fn record<V, E>(&self, result: &TaskResult<V, E>) {
        let counter = match result {
            Ok(_) => &self.completed_tasks,
            Err(TaskError::Handler(_)) => &self.failed_tasks,
            Err(TaskError::Panicked(_)) => &self.panicked_tasks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    async fn wait_workers(&self) {
        loop {
            let notified = self.all_workers_exited.notified();
            tokio::pin!(notified);
            // подписываемся до проверки счетчика, иначе можно пропустить notify_waiters
            notified.as_mut().enable();
            if self.active_workers.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Уменьшает счетчик воркеров при любом завершении задачи воркера
struct WorkerGuard {
    id: usize,
    counters: Arc<Counters>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        tracing::trace!(worker = self.id, "worker exited");
        let prev = self.counters.active_workers.fetch_sub(1, Ordering::AcqRel);
        if unlikely(prev == 1) {
            self.counters.all_workers_exited.notify_waiters();
        }
    }
}


/// Пул фиксированного размера: задачи типа `T`, результаты `Result<V, TaskError<E>>`.
///
/// Жизненный цикл: `new`/`with_config` → `start` → `push_task`... → `stop`.
/// `stop` потребляет пул, поэтому повторный `stop` и `push_task` после него не скомпилируются.
/// Повторный `start` запускает еще одну группу воркеров на тех же каналах;
/// это ошибка вызывающего кода, пул ее не проверяет.
pub struct Pool<T, V, E> {
    config: Config,
    handler: BoxHandler<T, V, E>,
    tasks_tx: Sender<Task<T>>,
    tasks_rx: Receiver<Task<T>>,
    results_tx: Option<Sender<TaskResult<V, E>>>,
    results_rx: Receiver<TaskResult<V, E>>,
    counters: Arc<Counters>,
}

impl<T, V, E> Pool<T, V, E>
where
    T: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
{
    /// Пул с конфигурацией по умолчанию: 3 воркера, каналы без буфера
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler<T, V, E>,
    {
        Self::with_config(handler, Config::default())
    }

    /// Создает каналы, но не запускает воркеров
    pub fn with_config<H>(handler: H, config: Config) -> Self
    where
        H: Handler<T, V, E>,
    {
        assert!(config.worker_count > 0, "number of workers must be positive");

        let (tasks_tx, tasks_rx) = channel::bounded(config.task_buffer_size);
        let (results_tx, results_rx) = match config.result_delivery {
            ResultDelivery::Buffered(size) => {
                let (tx, rx) = channel::bounded(size);
                (Some(tx), rx)
            }
            ResultDelivery::Discard => (None, channel::closed()),
        };

        Self {
            config,
            handler: task::boxed(handler),
            tasks_tx,
            tasks_rx,
            results_tx,
            results_rx,
            counters: Arc::new(Counters::default()),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Запускает `worker_count` воркеров. Требует контекст tokio runtime.
    pub fn start(&self) {
        tracing::debug!(
            workers = self.config.worker_count,
            task_buffer = self.config.task_buffer_size,
            results = ?self.config.result_delivery,
            "starting worker pool"
        );

        let first_id = self
            .counters
            .active_workers
            .fetch_add(self.config.worker_count, Ordering::AcqRel);

        for id in first_id..first_id + self.config.worker_count {
            let guard = WorkerGuard {
                id,
                counters: self.counters.clone(),
            };
            let tasks = self.tasks_rx.clone();
            let results = self.results_tx.clone();
            let handler = self.handler.clone();

            tokio::spawn(async move {
                Self::worker_loop(guard, tasks, results, handler).await;
            });
        }
    }

    async fn worker_loop(
        guard: WorkerGuard,
        tasks: Receiver<Task<T>>,
        mut results: Option<Sender<TaskResult<V, E>>>,
        handler: BoxHandler<T, V, E>,
    ) {
        while let Some(task) = tasks.recv().await {
            let result = task.run(&handler).await;
            guard.counters.record(&result);

            if let Some(tx) = &results {
                if tx.send(result).await.is_err() {
                    tracing::debug!(
                        worker = guard.id,
                        "all result receivers dropped, further results are discarded"
                    );
                    results = None;
                }
            }
        }
    }

    /// Отправляет задачу воркерам. Ждет, пока в буфере не появится место
    /// (или, без буфера, пока воркер не заберет задачу).
    ///
    /// Если ожидание прервано (timeout, `select!`), задача без буфера не передается воркерам.
    pub async fn push_task(&self, ctx: CancellationToken, item: T) {
        let sent = self.tasks_tx.send(Task::new(ctx, item)).await;
        // пул держит получателя задач до stop, поэтому канал открыт
        debug_assert!(sent.is_ok(), "task channel closed while the pool is alive");
    }

    /// Поток результатов; можно читать параллельно со `stop`
    #[inline]
    pub fn results(&self) -> Results<V, E> {
        Results::new(self.results_rx.clone())
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            active_workers: self.counters.active_workers.load(Ordering::Relaxed),
            completed_tasks: self.counters.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.counters.failed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.counters.panicked_tasks.load(Ordering::Relaxed),
        }
    }

    /// Закрывает канал задач, ждет завершения всех воркеров и закрывает канал результатов.
    /// Задачи, уже стоящие в очереди, будут выполнены.
    ///
    /// При канале результатов без буфера кто-то должен читать `results()` параллельно,
    /// иначе воркеры не смогут отдать результат и `stop` не вернется.
    pub async fn stop(self) {
        let Pool {
            tasks_tx,
            tasks_rx,
            results_tx,
            results_rx,
            counters,
            ..
        } = self;

        tracing::debug!("stopping worker pool");
        drop(tasks_tx);
        drop(tasks_rx);
        // без внешних Results воркеры просто отбросят результаты
        drop(results_rx);

        counters.wait_workers().await;
        drop(results_tx);

        tracing::debug!(
            completed = counters.completed_tasks.load(Ordering::Relaxed),
            failed = counters.failed_tasks.load(Ordering::Relaxed),
            panicked = counters.panicked_tasks.load(Ordering::Relaxed),
            "worker pool stopped"
        );
    }
}
