//! CAPTCHA fetching and recognition.

use crate::api::{Envelope, XHR};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jktb_core::{ErrorKind, ReportError, Result};
use jktb_http::{HttpRequest, Session};
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Stdin};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Errors raised by a CAPTCHA classifier.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// I/O error talking to the classifier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External classifier exited unsuccessfully
    #[error("classifier {program} failed with status {status}: {stderr}")]
    CommandFailed {
        /// Program that was run
        program: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error
        stderr: String,
    },
}

/// Image-to-text recognizer for CAPTCHA images.
///
/// The answer is not validated here; only the login attempt reveals whether
/// it was right.
#[async_trait]
pub trait CaptchaClassifier: Send + Sync {
    /// Recognize the text in a raw image.
    async fn classify(&self, image: &[u8]) -> std::result::Result<String, ClassifierError>;
}

/// Runs an external OCR program, feeding the image on stdin and reading the
/// answer from stdout.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
}

impl CommandClassifier {
    /// Create a classifier for `program` with its arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl CaptchaClassifier for CommandClassifier {
    async fn classify(&self, image: &[u8]) -> std::result::Result<String, ClassifierError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ClassifierError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Manual fallback: saves the image and asks for the answer on stdin.
///
/// One buffered reader is kept for the classifier's lifetime, so piped input
/// supplies one answer per line across retries.
#[derive(Debug)]
pub struct PromptClassifier<R = Stdin> {
    image_path: PathBuf,
    input: Mutex<BufReader<R>>,
}

impl PromptClassifier {
    /// Create a classifier that writes each image to `image_path` and reads
    /// answers from stdin.
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self::with_input(image_path, tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin> PromptClassifier<R> {
    /// Create a classifier that reads answers from `input`.
    pub fn with_input(image_path: impl Into<PathBuf>, input: R) -> Self {
        Self {
            image_path: image_path.into(),
            input: Mutex::new(BufReader::new(input)),
        }
    }
}

#[async_trait]
impl<R> CaptchaClassifier for PromptClassifier<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn classify(&self, image: &[u8]) -> std::result::Result<String, ClassifierError> {
        tokio::fs::write(&self.image_path, image).await?;
        eprint!("验证码已保存到 {}，请输入验证码: ", self.image_path.display());

        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(ClassifierError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no answer on input",
            )));
        }
        Ok(line.trim().to_string())
    }
}

/// Fetches a CAPTCHA over the session and hands it to a classifier.
pub struct VerifyCodeResolver<'a> {
    session: &'a Session,
    url: &'a str,
    classifier: &'a dyn CaptchaClassifier,
}

impl<'a> VerifyCodeResolver<'a> {
    /// Create a resolver fetching from `url`.
    pub fn new(session: &'a Session, url: &'a str, classifier: &'a dyn CaptchaClassifier) -> Self {
        Self {
            session,
            url,
            classifier,
        }
    }

    /// Fetch one CAPTCHA and return the classifier's reading of it.
    pub async fn resolve(&self) -> Result<String> {
        let request = HttpRequest::post(self.url).header(XHR.0, XHR.1);
        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| fetch_error("获取验证码失败").with_source(e))?;

        if !response.is_ok() {
            return Err(fetch_error(format!(
                "获取验证码失败 (HTTP {})",
                response.status
            )));
        }

        let payload: Envelope<String> = response
            .parse_json()
            .map_err(|e| fetch_error("验证码响应格式错误").with_source(e))?;
        let image = decode_image(&payload.into_content())?;

        let answer = self
            .classifier
            .classify(&image)
            .await
            .map_err(|e| fetch_error("验证码识别失败").with_source(e))?;

        tracing::debug!(image_bytes = image.len(), "verification code recognized");
        Ok(answer)
    }
}

/// Decode a `data:image/...;base64,<data>` URI into raw image bytes.
pub fn decode_image(data_uri: &str) -> Result<Vec<u8>> {
    let (_, encoded) = data_uri
        .split_once(',')
        .ok_or_else(|| fetch_error("验证码图片缺少 base64 数据"))?;

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| fetch_error("验证码图片解码失败").with_source(e))
}

fn fetch_error(message: impl Into<String>) -> ReportError {
    ReportError::new(ErrorKind::VerifyCodeFetch, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_image() {
        let bytes = decode_image("data:image/png;base64,iVBORw0KGgo=").expect("valid uri");
        assert_eq!(bytes, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_decode_image_without_comma() {
        let err = decode_image("iVBORw0KGgo=").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerifyCodeFetch);
    }

    #[test]
    fn test_decode_image_bad_base64() {
        let err = decode_image("data:image/png;base64,@@@").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerifyCodeFetch);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_classifier_reads_stdout() {
        let classifier = CommandClassifier::new(
            "sh",
            vec!["-c".into(), "cat >/dev/null; echo ' x7k2 '".into()],
        );
        let answer = classifier.classify(b"image").await.expect("classify");
        assert_eq!(answer, "x7k2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_classifier_failure() {
        let classifier = CommandClassifier::new(
            "sh",
            vec!["-c".into(), "cat >/dev/null; echo boom >&2; exit 3".into()],
        );
        let err = classifier.classify(b"image").await.unwrap_err();
        match err {
            ClassifierError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_prompt_classifier_reads_one_answer_per_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha.png");
        let classifier = PromptClassifier::with_input(&path, &b"ab12\n cd34 \n"[..]);

        assert_eq!(classifier.classify(b"first").await.unwrap(), "ab12");
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
        assert_eq!(classifier.classify(b"second").await.unwrap(), "cd34");
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let err = classifier.classify(b"third").await.unwrap_err();
        match err {
            ClassifierError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
    }
}
