//! Terminal prompts for the interactive login.

use std::io::{self, Write};

use super::error::AuthError;

/// Run a blocking stdin read on the blocking pool so the runtime is not
/// stalled.
async fn blocking_prompt<F>(read: F) -> Result<String, AuthError>
where
    F: FnOnce() -> io::Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| AuthError::Prompt(e.to_string()))?
        .map_err(|e| AuthError::Prompt(e.to_string()))
}

fn read_line(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub async fn prompt_email() -> Result<String, AuthError> {
    let email = blocking_prompt(|| read_line("Ring email: ")).await?;
    if email.is_empty() {
        return Err(AuthError::FailedLogin("No email entered".into()));
    }
    Ok(email)
}

pub async fn prompt_password() -> Result<String, AuthError> {
    let password = blocking_prompt(|| rpassword::prompt_password("Ring password: ")).await?;
    if password.is_empty() {
        return Err(AuthError::FailedLogin("No password entered".into()));
    }
    Ok(password)
}

/// Ask for the verification code Ring just sent by SMS, email or app.
pub async fn prompt_code() -> Result<String, AuthError> {
    let code = blocking_prompt(|| read_line("2FA code: ")).await?;
    normalize_code(&code)
}

/// Strip the separators people type (`123 456`, `123-456`) and check what
/// is left is digits only.
fn normalize_code(raw: &str) -> Result<String, AuthError> {
    let code: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::TwoFactorRejected(
            "Verification code must contain digits only".into(),
        ));
    }
    Ok(code)
}
