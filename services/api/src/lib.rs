mod automation;
mod cli;
mod infra;
mod postgres;
mod routes;
mod score;
mod server;

use lead_scoring::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
