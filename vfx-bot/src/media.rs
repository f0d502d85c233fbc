//! ffmpeg transform invoker
//!
//! Runs `ffmpeg -y -i <input> (-af|-filter_complex) <filters> -c:a libopus <output>`
//! as a child process with a hard timeout. A timed-out child is killed.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};
use vfx_common::{TransformError, TransformInvoker, TransformSpec};

/// Lines of ffmpeg stderr kept in a failure report
const STDERR_TAIL_LINES: usize = 20;

/// Command-line arguments for one transform
pub fn build_args(input: &Path, transform: &TransformSpec, output: &Path) -> Vec<OsString> {
    let filter_flag = match transform {
        TransformSpec::AudioFilter(_) => "-af",
        TransformSpec::FilterGraph(_) => "-filter_complex",
    };

    vec![
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        filter_flag.into(),
        transform.as_str().into(),
        "-c:a".into(),
        "libopus".into(),
        output.as_os_str().to_owned(),
    ]
}

/// Last lines of tool output; ffmpeg puts the actual error at the end
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Invokes a local ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegInvoker {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegInvoker {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// Version banner of the configured binary, or `None` if it cannot run
    pub async fn probe_version(&self) -> Option<String> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
    }
}

#[async_trait]
impl TransformInvoker for FfmpegInvoker {
    async fn invoke(
        &self,
        input: &Path,
        transform: &TransformSpec,
        output: &Path,
    ) -> Result<(), TransformError> {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(TransformError::InputMissing(input.to_path_buf()));
        }

        let started = Instant::now();
        let child = Command::new(&self.ffmpeg_path)
            .args(build_args(input, transform, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TransformError::Spawn(format!("{}: {}", self.ffmpeg_path.display(), e))
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    input = %input.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "ffmpeg timed out, killed"
                );
                return Err(TransformError::Timeout(self.timeout));
            }
        };

        let process_output = result.map_err(|e| TransformError::Failed {
            code: None,
            stderr: e.to_string(),
        })?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            status = %process_output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg finished"
        );

        if process_output.status.success() {
            Ok(())
        } else {
            Err(TransformError::Failed {
                code: process_output.status.code(),
                stderr: stderr_tail(&process_output.stderr),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_audio_filter() {
        let args = build_args(
            Path::new("in.ogg"),
            &TransformSpec::AudioFilter("areverse".to_string()),
            Path::new("out.ogg"),
        );
        let expected: Vec<OsString> = ["-y", "-i", "in.ogg", "-af", "areverse", "-c:a", "libopus", "out.ogg"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_build_args_filter_graph() {
        let args = build_args(
            Path::new("in.ogg"),
            &TransformSpec::FilterGraph("atempo=0.9".to_string()),
            Path::new("out.ogg"),
        );
        assert_eq!(args[3], OsString::from("-filter_complex"));
        assert_eq!(args[4], OsString::from("atempo=0.9"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 30"));
        assert!(tail.ends_with("line 49"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let invoker = FfmpegInvoker::new("ffmpeg", Duration::from_secs(5));
        let result = invoker
            .invoke(
                Path::new("/nonexistent/input.ogg"),
                &TransformSpec::AudioFilter("areverse".to_string()),
                Path::new("/nonexistent/output.ogg"),
            )
            .await;
        assert!(matches!(result, Err(TransformError::InputMissing(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ogg");
        std::fs::write(&input, b"ogg").unwrap();

        let invoker = FfmpegInvoker::new(dir.path().join("no-such-ffmpeg"), Duration::from_secs(5));
        let result = invoker
            .invoke(&input, &TransformSpec::AudioFilter("areverse".to_string()), &dir.path().join("out.ogg"))
            .await;
        assert!(matches!(result, Err(TransformError::Spawn(_))));
        assert!(invoker.probe_version().await.is_none());
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ogg");
        std::fs::write(&input, b"ogg").unwrap();
        let tool = fake_tool(dir.path(), "echo 'Invalid filter' >&2\nexit 3");

        let invoker = FfmpegInvoker::new(tool, Duration::from_secs(5));
        let result = invoker
            .invoke(&input, &TransformSpec::AudioFilter("bogus".to_string()), &dir.path().join("out.ogg"))
            .await;

        match result {
            Err(TransformError::Failed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("Invalid filter"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ogg");
        std::fs::write(&input, b"ogg").unwrap();
        let tool = fake_tool(dir.path(), "exec sleep 10");

        let invoker = FfmpegInvoker::new(tool, Duration::from_millis(200));
        let started = Instant::now();
        let result = invoker
            .invoke(&input, &TransformSpec::AudioFilter("areverse".to_string()), &dir.path().join("out.ogg"))
            .await;

        assert!(matches!(result, Err(TransformError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
