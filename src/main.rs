use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};

use product_batch::{
    config::CliArgs,
    product_import::{connect, create_product_table, run_product_import},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = CliArgs::parse();
    let config = cli.load()?;
    debug!("Configuration: {:?}", config);

    let pool = connect(&config.database_url).await?;
    if config.init_schema {
        create_product_table(&pool).await?;
    }

    match run_product_import(&config, &pool) {
        Ok(execution) => {
            for step in &execution.step_executions {
                info!(
                    "Step {}: {} read, {} written in {} chunks ({:?})",
                    step.name, step.read_count, step.write_count, step.commit_count, step.duration
                );
            }
            info!("Job {} completed in {:?}", config.job_name, execution.duration);
            pool.close().await;
            Ok(())
        }
        Err(err) => {
            error!("Job {} failed: {}", config.job_name, err);
            pool.close().await;
            std::process::exit(1);
        }
    }
}
