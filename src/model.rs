#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetrics {
    pub active_workers: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub panicked_tasks: usize,
}

impl PoolMetrics {
    pub fn finished_tasks(&self) -> usize {
        self.completed_tasks + self.failed_tasks + self.panicked_tasks
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.finished_tasks();
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}


/// Что делать с результатами задач
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDelivery {
    /// Результаты отдаются через канал с указанной емкостью (0 = без буфера)
    Buffered(usize),
    /// Обработчик выполняется, но результат отбрасывается; канал результатов закрыт сразу
    Discard,
}

impl Default for ResultDelivery {
    fn default() -> Self {
        ResultDelivery::Buffered(0)
    }
}

impl ResultDelivery {
    /// Старый контракт с размером буфера: `-1` означает, что результаты не нужны.
    pub fn from_buffer_size(size: isize) -> Self {
        match size {
            -1 => ResultDelivery::Discard,
            n if n >= 0 => ResultDelivery::Buffered(n as usize),
            n => panic!("result buffer size must be non-negative or -1, got {}", n),
        }
    }

    #[inline]
    pub fn is_discard(&self) -> bool {
        matches!(self, ResultDelivery::Discard)
    }
}
