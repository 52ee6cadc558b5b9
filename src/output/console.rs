use super::OutputHandler;
use crate::error::{Error, Result};
use crate::outcome::FetchOutcome;
use async_trait::async_trait;
use indicatif::MultiProgress;

/// Prints each outcome as pretty JSON, above any active progress bars.
#[derive(Default)]
pub struct ConsoleOutput {
    multi: Option<MultiProgress>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<MultiProgress>) -> Self {
        Self { multi }
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, outcome: &FetchOutcome) -> Result<()> {
        let output = serde_json::to_string_pretty(outcome)?;

        match &self.multi {
            Some(multi) => {
                for line in output.lines() {
                    multi
                        .println(line)
                        .map_err(|e| Error::Internal(e.to_string()))?;
                }
            }
            None => println!("{}", output),
        }
        Ok(())
    }
}
