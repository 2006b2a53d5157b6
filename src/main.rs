use async_workpool::{CancellationToken, Config, Pool};
use std::{convert::Infallible, time::Instant};
use tokio::runtime::Builder;


fn main(){
    let rt = Builder::new_multi_thread()
    .worker_threads(4)
    .enable_all()
    .build()
    .unwrap();

    rt.block_on(async{
        let now = Instant::now();
        let pool = Pool::with_config(
            |_ctx: CancellationToken, x: u64| async move { Ok::<_, Infallible>(x * x) },
            Config::default()
                .with_worker_count(1)
                .with_result_buffer_size(3),
        );
        pool.start();

        let results = pool.results();
        tokio::spawn(async move {
            let ctx = CancellationToken::new();
            for i in 0..3 {
                pool.push_task(ctx.clone(), i).await;
            }
            pool.stop().await;
        });

        while let Some(res) = results.recv().await {
            match res {
                Ok(value) => println!("{}", value),
                Err(err) => println!("error: {}", err),
            }
        }
        println!("elapsed: {:?}",now.elapsed());
    });
}
