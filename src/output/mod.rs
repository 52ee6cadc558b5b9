//! Writers that receive each finished outcome in input order.

use crate::error::Result;
use crate::outcome::FetchOutcome;
use async_trait::async_trait;

pub mod console;
pub mod json;

pub use console::ConsoleOutput;
pub use json::JsonOutput;

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, outcome: &FetchOutcome) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
