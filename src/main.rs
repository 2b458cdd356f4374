use kafka_consumer_pool::{
    config::LaunchConfig,
    init, kafka,
    pool::{ConsumerPool, SHUTDOWN_TIMEOUT},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init::init_tracing()?;

    let conf = LaunchConfig::load();

    let mut pool = ConsumerPool::launch(&conf, |id| kafka::connect(&conf.properties, id))?;

    init::shutdown_signal().await;

    pool.shutdown(SHUTDOWN_TIMEOUT).await;

    Ok(())
}
