use anyhow::{bail, Result};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

/// Line prompts on stderr, answers read from stdin. One reader per command so
/// piped input spanning several prompts is not lost between reads.
pub struct Prompt {
    reader: BufReader<Stdin>,
}

impl Prompt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }

    /// # Errors
    ///
    /// Returns an error when stdin is closed or unreadable.
    pub async fn line(&mut self, label: &str) -> Result<String> {
        let mut stderr = tokio::io::stderr();
        stderr.write_all(format!("{label}: ").as_bytes()).await?;
        stderr.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            bail!("no input for {label}");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// # Errors
    ///
    /// Returns an error when stdin is closed or unreadable.
    pub async fn secret(&mut self, label: &str) -> Result<SecretString> {
        Ok(SecretString::from(self.line(label).await?))
    }

    /// Uses `value` when given, otherwise asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error when stdin is closed or unreadable.
    pub async fn secret_or_ask(
        &mut self,
        value: Option<SecretString>,
        label: &str,
    ) -> Result<SecretString> {
        match value {
            Some(value) => Ok(value),
            None => self.secret(label).await,
        }
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}
