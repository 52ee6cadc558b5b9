use super::OutputHandler;
use crate::error::Result;
use crate::outcome::FetchOutcome;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streams outcomes into a single JSON array; the array is closed by `close`.
pub struct JsonOutput {
    writer: BufWriter<File>,
    first: bool,
}

impl JsonOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        write!(writer, "[")?;

        Ok(Self {
            writer,
            first: true,
        })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, outcome: &FetchOutcome) -> Result<()> {
        if self.first {
            self.first = false;
        } else {
            write!(self.writer, ",")?;
        }
        serde_json::to_writer(&mut self.writer, outcome)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        write!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let mut output = JsonOutput::new(&path).unwrap();
        output.write(&FetchOutcome::invalid("bad")).await.unwrap();
        output.write(&FetchOutcome::invalid("worse")).await.unwrap();
        output.close().await.unwrap();

        let written: Vec<FetchOutcome> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let urls: Vec<&str> = written.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, ["bad", "worse"]);
        assert_eq!(written[0].error_message.as_deref(), Some("Invalid URL"));
    }

    #[tokio::test]
    async fn empty_run_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        let mut output = JsonOutput::new(&path).unwrap();
        output.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
