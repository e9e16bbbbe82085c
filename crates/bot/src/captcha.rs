use core::fmt::Debug;
use std::{fs, io::IsTerminal as _, path::Path};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kik_core::CaptchaChallenge;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};

/// Read a previously solved captcha token. A missing or empty file means
/// there is none; the content is otherwise passed through untouched.
pub fn load_captcha_result(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        info!(file = %path.display(), "No latest captcha result found");
        return Ok(None);
    }
    let token = fs::read_to_string(path)
        .with_context(|| format!("reading captcha result at {}", path.display()))?;
    if token.is_empty() {
        return Ok(None);
    }
    info!(file = %path.display(), "Loaded latest captcha result");
    Ok(Some(token))
}

pub fn save_captcha_result(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating captcha directory at {}", parent.display()))?;
    }
    fs::write(path, token)
        .with_context(|| format!("writing captcha result at {}", path.display()))?;
    Ok(())
}

/// Produces a solved token for a captcha challenge.
#[async_trait]
pub trait CaptchaSolver: Send + Sync + Debug {
    /// `Ok(None)` means no token is available and login should not be retried.
    async fn solve(&self, challenge: &CaptchaChallenge) -> Result<Option<String>>;
}

/// Asks the operator on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSolver;

#[async_trait]
impl CaptchaSolver for TerminalSolver {
    async fn solve(&self, challenge: &CaptchaChallenge) -> Result<Option<String>> {
        prompt_for_solution(challenge).await
    }
}

/// Ask the operator to solve `challenge` and paste the resulting token.
/// Returns `None` when nobody can answer (non-interactive) or the answer
/// is blank.
async fn prompt_for_solution(challenge: &CaptchaChallenge) -> Result<Option<String>> {
    if !std::io::stdin().is_terminal() {
        warn!(url = %challenge.url, "Captcha required but stdin is not interactive; solve it and write the token to the captcha file");
        return Ok(None);
    }
    eprintln!(
        "Captcha required. Open this URL, solve the challenge, then paste the response token:\n  {}",
        challenge.url
    );
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading captcha token from stdin")?;
    let token = line.trim();
    Ok((!token.is_empty()).then(|| token.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_captcha_result(&dir.path().join("missing.txt")).unwrap(), None);
    }

    #[test]
    fn saved_token_is_loaded_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("latest_captcha_result.txt");
        save_captcha_result(&path, "03AGdBq24...token").unwrap();
        assert_eq!(
            load_captcha_result(&path).unwrap().as_deref(),
            Some("03AGdBq24...token")
        );
    }

    #[test]
    fn save_reports_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = save_captcha_result(&blocker.join("token.txt"), "tok").unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("creating captcha directory"), "{msg}");
        assert!(msg.contains("blocker"), "{msg}");
    }

    #[test]
    fn empty_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_captcha_result.txt");
        fs::write(&path, "").unwrap();
        assert_eq!(load_captcha_result(&path).unwrap(), None);
    }
}
