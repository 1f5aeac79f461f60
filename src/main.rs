use timeout_after::{race_value_with_timeout, Outcome, RaceConfig, TimeoutSpec};
use tokio::runtime::Builder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::time::{Duration, Instant};


fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timeout_after=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rt = Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()?;

    rt.block_on(async {
        let now = Instant::now();
        let config = RaceConfig::new(TimeoutSpec::from_secs_f64(5.0)?)
            .on_timeout(|| println!("TIMEOUT OCCURED!"));

        let outcome = race_value_with_timeout(
            async {
                println!("Main task running...");
                tokio::time::sleep(Duration::from_secs(10)).await;
            },
            config,
        )
        .await;

        match outcome {
            Outcome::Completed(()) => println!("main task finished"),
            Outcome::Failed(failure) => println!("main task failed: {failure}"),
            Outcome::TimedOut => println!("main task timed out"),
        }
        println!("elapsed: {:?}", now.elapsed());
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    // Отсоединенная задача может еще спать
    rt.shutdown_background();
    Ok(())
}
