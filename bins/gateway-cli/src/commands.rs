// CLI commands for talking to the judge through the gateway
use anyhow::{bail, Context, Result};
use judge_gateway::{GatewayConfig, SubmissionClient, SubmissionRequest, SubmissionResponse};
use std::fs;
use std::path::{Path, PathBuf};

fn client() -> Result<SubmissionClient> {
    let config = GatewayConfig::from_env().context("Invalid judge configuration")?;
    SubmissionClient::from_config(&config).context("Failed to build judge client")
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Build a request from files on disk
pub fn load_request(
    file: &Path,
    language_id: u32,
    stdin: Option<&Path>,
    expected: Option<&Path>,
) -> Result<SubmissionRequest> {
    let source = read_text(file)?;
    if source.trim().is_empty() {
        bail!("Source file {} is empty", file.display());
    }

    let mut request = SubmissionRequest::new(source, language_id);
    if let Some(path) = stdin {
        request = request.with_stdin(read_text(path)?);
    }
    if let Some(path) = expected {
        request = request.with_expected_output(read_text(path)?);
    }
    Ok(request)
}

fn print_response(label: &str, response: &SubmissionResponse) -> Result<()> {
    println!("── {} [{}]", label, response.status.id);
    println!("{}", serde_json::to_string_pretty(response).context("Failed to render response")?);
    Ok(())
}

/// Submit one file and print the decoded result
pub async fn submit(
    file: &Path,
    language_id: u32,
    stdin: Option<&Path>,
    expected: Option<&Path>,
) -> Result<()> {
    let request = load_request(file, language_id, stdin, expected)?;
    let response = client()?
        .submit_and_wait(&request)
        .await
        .context("Submission failed")?;

    print_response(&file.display().to_string(), &response)
}

/// Submit several files as one batch, printing results in file order
pub async fn batch(files: &[PathBuf], language_id: u32) -> Result<()> {
    let requests = files
        .iter()
        .map(|f| load_request(f, language_id, None, None))
        .collect::<Result<Vec<_>>>()?;

    let responses = client()?
        .submit_batch(&requests)
        .await
        .context("Batch submission failed")?;

    for (file, response) in files.iter().zip(&responses) {
        print_response(&file.display().to_string(), response)?;
    }

    let unfinished = responses.iter().filter(|r| !r.is_finished()).count();
    if unfinished > 0 {
        println!("⚠ {} submission(s) still running when polling stopped", unfinished);
    }
    Ok(())
}

/// Exit non-zero when the judge is unreachable
pub async fn health() -> Result<()> {
    if client()?.is_healthy().await {
        println!("✓ Judge is healthy");
        Ok(())
    } else {
        bail!("Judge is unhealthy or unreachable");
    }
}
