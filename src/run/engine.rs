use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::RunOutcome;
use super::filter::OutputFilter;
use crate::error::Error;

/// Reads engine output to the end, passing filtered lines to `on_line`.
///
/// Bytes that are not valid UTF-8 are replaced rather than treated as a failure.
pub async fn consume_output<R, F>(mut reader: R, on_line: &mut F) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str),
{
    let mut filter = OutputFilter::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(Error::ChannelBroken)?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        for shown in filter.feed(line)? {
            on_line(&shown);
        }
    }
    for shown in filter.finish() {
        on_line(&shown);
    }
    Ok(())
}

/// A running engine process whose output has not been read yet.
#[derive(Debug)]
pub struct EngineProcess {
    executable: String,
    child: Child,
    stdout: ChildStdout,
}

impl EngineProcess {
    /// Starts `<executable> -in <script>` in `working_dir`.
    pub fn spawn(executable: &str, script: &Path, working_dir: &Path) -> Result<Self, Error> {
        info!("Launching {} -in {}", executable, script.display());

        let mut child = Command::new(executable)
            .arg("-in")
            .arg(script)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                executable: executable.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::ChannelBroken(io::Error::other("engine stdout was not captured"))
        })?;

        Ok(Self {
            executable: executable.to_string(),
            child,
            stdout,
        })
    }

    /// Streams the engine's output until it exits or the user interrupts it.
    ///
    /// There is no timeout. On Ctrl-C the engine is killed and the outcome is
    /// [`RunOutcome::Terminated`].
    pub async fn stream<F>(self, on_line: &mut F) -> Result<RunOutcome, Error>
    where
        F: FnMut(&str),
    {
        self.stream_until(on_line, tokio::signal::ctrl_c()).await
    }

    /// Like [`stream`](Self::stream), with `cancel` in place of Ctrl-C.
    pub async fn stream_until<F, C>(
        mut self,
        on_line: &mut F,
        cancel: C,
    ) -> Result<RunOutcome, Error>
    where
        F: FnMut(&str),
        C: Future,
    {
        tokio::select! {
            streamed = consume_output(BufReader::new(self.stdout), on_line) => streamed?,
            _ = cancel => {
                warn!("Interrupted, killing {}", self.executable);
                self.child.kill().await?;
                return Ok(RunOutcome::Terminated);
            }
        }

        let status = self.child.wait().await?;
        debug!("{} exited with {}", self.executable, status);
        if !status.success() {
            return Err(Error::EngineFailed(status));
        }
        Ok(RunOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, ReadBuf};

    use super::*;

    #[tokio::test]
    async fn output_is_filtered_line_by_line() {
        let output = &b"LAMMPS (2 Aug 2023)\nCreated 1 atoms\nCreated 1 atoms\nCreated 1 atoms\nCreated 1 atoms\nCreated 1 atoms\nStep Temp\n"[..];
        let mut seen = Vec::new();
        consume_output(output, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(seen, ["LAMMPS (2 Aug 2023)", "Created 5 atoms", "Step Temp"]);
    }

    #[tokio::test]
    async fn pending_summary_is_flushed_at_eof() {
        let output = &b"Created 2 atoms\n  create_atoms CPU = 0.000 seconds\n"[..];
        let mut seen = Vec::new();
        consume_output(output, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(seen, ["Created 2 atoms"]);
    }

    #[tokio::test]
    async fn zero_atoms_aborts_streaming() {
        let output = &b"Created 0 atoms\nStep Temp\n"[..];
        let mut seen = Vec::new();
        let err = consume_output(output, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IonsOutsideDomain));
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let output = &b"LAMMPS (fake)\nWARNING: bad char \xff here\nStep Temp"[..];
        let mut seen = Vec::new();
        consume_output(output, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(
            seen,
            ["LAMMPS (fake)", "WARNING: bad char \u{FFFD} here", "Step Temp"]
        );
    }

    #[tokio::test]
    async fn crlf_line_endings_are_stripped() {
        let output = &b"Created 1 atoms\r\nCreated 1 atoms\r\nLoop time\r\n"[..];
        let mut seen = Vec::new();
        consume_output(output, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(seen, ["Created 2 atoms", "Loop time"]);
    }

    /// A reader whose pipe fails after the first read.
    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)));
            }
            self.sent = true;
            buf.put_slice(b"LAMMPS (fake)\n");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn pipe_failure_is_a_broken_channel() {
        let reader = BufReader::new(BrokenPipe { sent: false });
        let mut seen = Vec::new();
        let err = consume_output(reader, &mut |line: &str| seen.push(line.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelBroken(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(seen, ["LAMMPS (fake)"]);
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("missing.lammps");
        let err = EngineProcess::spawn("ion-forge-no-such-engine", &script, dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
