//! Interactive confirmation for known duplicates

use crate::models::SourceFile;
use crate::services::{DuplicateResolver, LedgerHeader};
use async_trait::async_trait;
use std::io::{BufRead, Write};

/// Asks the operator on the terminal whether to re-import
///
/// Blocks on stdin in a blocking task; anything but an explicit yes
/// declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalResolver;

#[async_trait]
impl DuplicateResolver for TerminalResolver {
    async fn confirm_reimport(&self, file: &SourceFile, header: &LedgerHeader, message: &str) -> bool {
        let question = format!(
            "{}: an import for CNPJ {} starting {} already exists{}.\nUpload anyway? [y/N] ",
            file.name,
            header.cnpj,
            header.period_start,
            if message.is_empty() {
                String::new()
            } else {
                format!(" ({})", message)
            }
        );

        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(question.as_bytes())?;
            stderr.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Could not read confirmation, declining");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation task failed, declining");
                false
            }
        }
    }
}

/// Accepts yes in English and Portuguese
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    )
}
