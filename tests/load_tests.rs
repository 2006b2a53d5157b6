#[cfg(test)]
mod tests {
    use async_workpool::{
        CancellationToken,
        Config,
        Pool,
    };
    use std::{
        convert::Infallible,
        future::Future,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    async fn measure<F, Fut, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        result
    }

    /// Выполняет действие при выходе из области видимости, в том числе при панике теста
    struct OnDrop<F: FnOnce()>(Option<F>);

    impl<F: FnOnce()> Drop for OnDrop<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f();
            }
        }
    }

    #[test]
    fn test_on_drop_runs_while_unwinding() {
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        let caught = std::panic::catch_unwind(move || {
            let _guard = OnDrop(Some(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            }));
            panic!("assertion failed inside the test body");
        });
        assert!(caught.is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    fn update_max(current_max: &AtomicUsize, candidate: usize) {
        let mut prev = current_max.load(Ordering::SeqCst);
        while candidate > prev {
            match current_max.compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => break,
                Err(next) => prev = next,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn load_test_1_small_fast_tasks() {
        println!("\n=== LOAD TEST 1: 10k быстрых задач (100μs каждая) ===");
        let pool = Pool::with_config(
            |_ctx: CancellationToken, x: u64| async move {
                tokio::time::sleep(Duration::from_micros(100)).await;
                Ok::<_, Infallible>(x * 2)
            },
            Config::io_bound().with_result_buffer_size(256),
        );
        pool.start();
        let results = pool.results();

        let producer = tokio::spawn(async move {
            let ctx = CancellationToken::new();
            for i in 0..10_000 {
                pool.push_task(ctx.clone(), i).await;
            }
            let metrics = pool.metrics();
            pool.stop().await;
            metrics
        });

        let drained = measure("10k tasks @ 100μs", || results.drain()).await;
        let metrics = producer.await.unwrap();

        assert_eq!(drained.len(), 10_000);
        let sum: u64 = drained.into_iter().map(|res| res.unwrap()).sum();
        assert_eq!(sum, (0..10_000u64).map(|x| x * 2).sum::<u64>());
        println!("  Успешно на момент последней отправки: {}", metrics.completed_tasks);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_2_concurrency_is_bounded() {
        println!("\n=== LOAD TEST 2: Параллельность ограничена числом воркеров ===");
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let handler = {
            let running = running.clone();
            let max_running = max_running.clone();
            move |_ctx: CancellationToken, x: usize| {
                let running = running.clone();
                let max_running = max_running.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    update_max(&max_running, now);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(x)
                }
            }
        };

        let pool = Pool::with_config(
            handler,
            Config::default()
                .with_worker_count(4)
                .with_task_buffer_size(16)
                .discard_results(),
        );
        pool.start();

        let ctx = CancellationToken::new();
        let (pool_ref, ctx_ref) = (&pool, &ctx);
        measure("500 tasks @ 2ms, 4 workers", || async move {
            for i in 0..500 {
                pool_ref.push_task(ctx_ref.clone(), i).await;
            }
        })
        .await;
        pool.stop().await;

        let max = max_running.load(Ordering::SeqCst);
        println!("  Максимум одновременно: {}", max);
        assert!(max <= 4, "одновременно выполнялось {} задач", max);
        assert!(max >= 2, "задачи не выполнялись параллельно");
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_3_panics_do_not_kill_workers() {
        println!("\n=== LOAD TEST 3: Паники не убивают воркеров ===");

        // Подавляем вывод паник в этом тесте
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        // восстанавливаем panic handler даже если assert ниже упадет
        let _restore_hook = OnDrop(Some(move || std::panic::set_hook(prev_hook)));

        let pool = Pool::with_config(
            |_ctx: CancellationToken, x: u32| async move {
                if x % 10 == 0 {
                    panic!("Test panic");
                }
                if x % 10 == 1 {
                    return Err(format!("bad input {}", x));
                }
                Ok(x)
            },
            Config::cpu_bound().with_result_buffer_size(64),
        );
        pool.start();
        let results = pool.results();

        let ctx = CancellationToken::new();
        let producer = tokio::spawn(async move {
            for i in 0..1_000 {
                pool.push_task(ctx.clone(), i).await;
            }
            let workers = pool.metrics().active_workers;
            pool.stop().await;
            workers
        });

        let drained = results.drain().await;
        let workers = producer.await.unwrap();

        let panicked = drained
            .iter()
            .filter(|res| matches!(res, Err(err) if err.is_panic()))
            .count();
        let failed = drained
            .iter()
            .filter(|res| matches!(res, Err(err) if !err.is_panic()))
            .count();

        assert_eq!(drained.len(), 1_000);
        assert_eq!(panicked, 100);
        assert_eq!(failed, 100);
        assert_eq!(workers, num_cpus::get(), "ни один воркер не должен упасть");
    }
}
