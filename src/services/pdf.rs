use std::process::Stdio;
use std::time::Duration;

use derive_more::Display;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Display)]
pub enum PdfError {
    #[display(fmt = "PDF command is empty")]
    EmptyCommand,
    #[display(fmt = "Failed to run PDF command: {}", _0)]
    Io(String),
    #[display(fmt = "PDF rendering timed out after {}s", _0)]
    Timeout(u64),
    #[display(fmt = "PDF command failed: {}", _0)]
    Failed(String),
}

/// Pipes `html` into `command` and returns its stdout.
///
/// The command is split on whitespace; the first word is the program.
pub async fn render_pdf(command: &str, html: &str, timeout: Duration) -> Result<Vec<u8>, PdfError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(PdfError::EmptyCommand)?;

    debug!(program, timeout_secs = timeout.as_secs(), "Rendering invoice PDF");

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PdfError::Io(e.to_string()))?;

    // Feed stdin while stdout is drained; the timeout covers both.
    let stdin = child.stdin.take();
    let exchange = async move {
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(html.as_bytes()).await?;
                // closing stdin signals end of document
                drop(stdin);
            }
            Ok::<_, std::io::Error>(())
        };
        tokio::join!(write, child.wait_with_output())
    };

    let (written, output) = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| {
            warn!(timeout_secs = timeout.as_secs(), "PDF command timed out, killing process");
            PdfError::Timeout(timeout.as_secs())
        })?;
    let output = output.map_err(|e| PdfError::Io(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PdfError::Failed(stderr.trim().to_string()));
    }
    if let Err(e) = written {
        return Err(PdfError::Io(e.to_string()));
    }
    if output.stdout.is_empty() {
        return Err(PdfError::Failed("no output".to_string()));
    }

    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn passes_stdin_through() {
        let pdf = render_pdf("cat", "<html></html>", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(pdf, b"<html></html>");
    }

    #[actix_web::test]
    async fn large_documents_stream_through() {
        let html = "x".repeat(2 * 1024 * 1024);
        let pdf = tokio::time::timeout(
            Duration::from_secs(15),
            render_pdf("cat", &html, Duration::from_secs(10)),
        )
        .await
        .expect("render finished on its own")
        .unwrap();
        assert_eq!(pdf.len(), html.len());
    }

    #[actix_web::test]
    async fn stalled_reader_hits_the_timeout() {
        let html = "x".repeat(2 * 1024 * 1024);
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(15),
            render_pdf("sleep 30", &html, Duration::from_secs(1)),
        )
        .await
        .expect("render gave up on its own");
        assert!(matches!(result, Err(PdfError::Timeout(1))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[actix_web::test]
    async fn reports_failures() {
        assert!(matches!(
            render_pdf("   ", "x", Duration::from_secs(1)).await,
            Err(PdfError::EmptyCommand)
        ));
        assert!(matches!(
            render_pdf("false", "x", Duration::from_secs(5)).await,
            Err(PdfError::Failed(_))
        ));
    }
}
