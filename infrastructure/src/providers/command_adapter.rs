//! Provider adapter backed by an external bridge process.
//!
//! The bridge owns the browser automation for one provider. Every adapter
//! operation runs `<command> <args..> <subcommand>` once; see
//! [`protocol`](super::protocol) for the payloads and
//! [`error`](super::error) for the exit code contract.

use super::error::{BridgeError, EXIT_SESSION_INVALID};
use super::protocol::{SendRequest, SendResponse, SessionBundle};
use crate::config::FileProviderConfig;
use aigenflow_application::{ProviderAdapter, ProviderError, ProviderReply};
use aigenflow_domain::{Credential, ProviderKind};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Bound on the status-only subcommands
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time granted on top of the login timeout for the bridge to exit
const LOGIN_GRACE: Duration = Duration::from_secs(5);

pub struct CommandProviderAdapter {
    kind: ProviderKind,
    command: String,
    args: Vec<String>,
    send_timeout: Duration,
}

impl CommandProviderAdapter {
    pub fn new(kind: ProviderKind, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            command: command.into(),
            args,
            send_timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(kind: ProviderKind, config: &FileProviderConfig) -> Self {
        Self::new(kind, config.command.clone(), config.args.clone())
            .with_send_timeout(config.timeout())
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Whether the bridge executable can be found
    pub fn is_installed(&self) -> bool {
        self.resolve().is_ok()
    }

    fn resolve(&self) -> Result<PathBuf, BridgeError> {
        which::which(&self.command).map_err(|e| BridgeError::NotFound {
            command: self.command.clone(),
            reason: e.to_string(),
        })
    }

    /// Run one subcommand, feeding `input` on stdin, and return its stdout.
    ///
    /// A non-zero exit becomes [`BridgeError::Exit`].
    async fn invoke(
        &self,
        subcommand: &str,
        extra: &[String],
        input: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BridgeError> {
        let program = self.resolve()?;
        debug!(
            provider = %self.kind,
            command = %program.display(),
            subcommand,
            "Running bridge"
        );

        let mut cmd = Command::new(&program);
        cmd.args(&self.args)
            .arg(subcommand)
            .args(extra)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let run = async {
            if let Some(data) = input
                && let Some(mut stdin) = child.stdin.take()
            {
                stdin.write_all(&data).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| BridgeError::Timeout(timeout))??;

        if output.status.success() {
            return Ok(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(BridgeError::Exit {
            code: output.status.code(),
            stderr,
        })
    }

    /// Run a status-only subcommand: exit 0 is `true`, the session-invalid
    /// exit code is `false`, anything else is an error.
    async fn status(
        &self,
        subcommand: &str,
        extra: &[String],
        input: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<bool, ProviderError> {
        match self.invoke(subcommand, extra, input, timeout).await {
            Ok(_) => Ok(true),
            Err(e) if e.exit_code() == Some(EXIT_SESSION_INVALID) => {
                debug!(provider = %self.kind, subcommand, "Bridge reported invalid session");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(stdout: &[u8]) -> Result<T, BridgeError> {
    serde_json::from_slice(stdout).map_err(|e| BridgeError::Parse {
        error: e.to_string(),
        raw: String::from_utf8_lossy(stdout).into_owned(),
    })
}

#[async_trait]
impl ProviderAdapter for CommandProviderAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn send(&self, prompt: &str, context: &str) -> Result<ProviderReply, ProviderError> {
        let started = Instant::now();
        let request = serde_json::to_vec(&SendRequest { prompt, context })
            .map_err(BridgeError::from)?;
        let stdout = self
            .invoke("send", &[], Some(request), self.send_timeout)
            .await?;
        let response: SendResponse = parse(&stdout)?;
        if response.content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "bridge returned empty content".to_string(),
            ));
        }
        Ok(ProviderReply::new(response.content)
            .with_tokens(response.tokens_used)
            .with_latency(started.elapsed()))
    }

    async fn check_session(&self) -> Result<bool, ProviderError> {
        self.status("check", &[], None, STATUS_TIMEOUT).await
    }

    async fn refresh_session(&self) -> Result<bool, ProviderError> {
        self.status("refresh", &[], None, STATUS_TIMEOUT).await
    }

    async fn login_flow(&self, timeout: Duration) -> Result<bool, ProviderError> {
        let extra = vec!["--timeout-secs".to_string(), timeout.as_secs().to_string()];
        match self.status("login", &extra, None, timeout + LOGIN_GRACE).await {
            Err(ProviderError::Timeout(_)) => {
                warn!(provider = %self.kind, "Login flow did not finish in {:?}", timeout);
                Ok(false)
            }
            other => other,
        }
    }

    async fn save_session(&self) -> Result<Option<Credential>, ProviderError> {
        let stdout = self.invoke("export", &[], None, STATUS_TIMEOUT).await?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let bundle: SessionBundle = parse(&stdout)?;
        if bundle.secret.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Credential::new(bundle.secret).with_item_count(bundle.item_count),
        ))
    }

    async fn load_session(&self, credential: &Credential) -> Result<bool, ProviderError> {
        let bundle = SessionBundle {
            secret: credential.expose().to_string(),
            item_count: credential.item_count(),
        };
        let input = serde_json::to_vec(&bundle).map_err(BridgeError::from)?;
        self.status("import", &[], Some(input), STATUS_TIMEOUT).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;

    /// Adapter running `sh <dir>/bridge.sh <subcommand>`
    fn bridge(dir: &Path, body: &str) -> CommandProviderAdapter {
        let script = dir.join("bridge.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        CommandProviderAdapter::new(
            ProviderKind::Claude,
            "sh",
            vec![script.to_string_lossy().into_owned()],
        )
        .with_send_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_send_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stdin.json");
        let adapter = bridge(
            dir.path(),
            &format!(
                r#"[ "$1" = send ] || exit 1
cat > "{}"
echo '{{"content":"사업계획서 초안","tokens_used":42}}'"#,
                input.display()
            ),
        );

        let reply = adapter.send("Write the plan", "## Phase 1: Framing").await.unwrap();
        assert_eq!(reply.content, "사업계획서 초안");
        assert_eq!(reply.tokens_used, 42);

        let sent: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&input).unwrap()).unwrap();
        assert_eq!(sent["prompt"], "Write the plan");
        assert_eq!(sent["context"], "## Phase 1: Framing");
    }

    #[tokio::test]
    async fn test_send_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(dir.path(), "cat >/dev/null; echo 'cookie expired' >&2; exit 3");
        assert_eq!(
            adapter.send("p", "").await,
            Err(ProviderError::SessionInvalid("cookie expired".to_string()))
        );

        let adapter = bridge(dir.path(), "cat >/dev/null; exit 4");
        assert!(matches!(
            adapter.send("p", "").await,
            Err(ProviderError::RateLimited(_))
        ));

        let adapter = bridge(dir.path(), "cat >/dev/null; exit 1");
        assert!(matches!(
            adapter.send("p", "").await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_send_garbage_and_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(dir.path(), "cat >/dev/null; echo '<html>captcha</html>'");
        assert!(matches!(
            adapter.send("p", "").await,
            Err(ProviderError::InvalidResponse(_))
        ));

        let adapter = bridge(dir.path(), r#"cat >/dev/null; echo '{"content":"  "}'"#);
        assert!(matches!(
            adapter.send("p", "").await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_send_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(dir.path(), "sleep 5")
            .with_send_timeout(Duration::from_millis(200));
        assert_eq!(
            adapter.send("p", "").await,
            Err(ProviderError::Timeout(Duration::from_millis(200)))
        );
    }

    #[tokio::test]
    async fn test_status_subcommands() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(
            dir.path(),
            r#"case "$1" in
  check) exit 0 ;;
  refresh) exit 3 ;;
  login) [ "$2" = "--timeout-secs" ] && [ "$3" = "7" ] || exit 1 ;;
  *) exit 1 ;;
esac"#,
        );
        assert!(adapter.check_session().await.unwrap());
        assert!(!adapter.refresh_session().await.unwrap());
        assert!(adapter.login_flow(Duration::from_secs(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_unavailable_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(dir.path(), "exit 2");
        assert!(matches!(
            adapter.check_session().await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_export_and_import() {
        let dir = tempfile::tempdir().unwrap();
        let imported = dir.path().join("imported.json");
        let adapter = bridge(
            dir.path(),
            &format!(
                r#"case "$1" in
  export) echo '{{"secret":"sid=abc","item_count":3}}' ;;
  import) cat > "{}" ;;
  *) exit 1 ;;
esac"#,
                imported.display()
            ),
        );

        let credential = adapter.save_session().await.unwrap().unwrap();
        assert_eq!(credential.expose(), "sid=abc");
        assert_eq!(credential.item_count(), 3);

        assert!(adapter.load_session(&credential).await.unwrap());
        let bundle: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&imported).unwrap()).unwrap();
        assert_eq!(bundle["secret"], "sid=abc");
        assert_eq!(bundle["item_count"], 3);
    }

    #[tokio::test]
    async fn test_export_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = bridge(dir.path(), "exit 0");
        assert!(adapter.save_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_command() {
        let adapter = CommandProviderAdapter::new(
            ProviderKind::Gemini,
            "aigenflow-bridge-that-does-not-exist",
            Vec::new(),
        );
        assert!(!adapter.is_installed());
        assert!(matches!(
            adapter.check_session().await,
            Err(ProviderError::Unavailable(msg)) if msg.contains("not found")
        ));
    }

    #[test]
    fn test_from_config_uses_provider_args() {
        let config = FileProviderConfig::for_provider(ProviderKind::Perplexity);
        let adapter = CommandProviderAdapter::from_config(ProviderKind::Perplexity, &config);
        assert_eq!(adapter.args, vec!["--provider", "perplexity"]);
        assert_eq!(adapter.send_timeout, Duration::from_secs(120));
        assert_eq!(adapter.kind(), ProviderKind::Perplexity);
    }
}
