use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::topology::Pod;

/// Captured outcome of one remote command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout of a successful command, or a typed failure carrying the
    /// remote stderr.
    pub fn ok_stdout(self, pod: &str) -> Result<String, ExecError> {
        if self.success() {
            return Ok(self.stdout);
        }
        Err(ExecError::Failed {
            pod: pod.to_string(),
            status: self.exit_code.unwrap_or(-1),
            stderr: self.stderr,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to capture remote command output: {0}")]
    Capture(std::io::Error),

    #[error("remote command in pod {pod} timed out after {timeout:?}")]
    Timeout { pod: String, timeout: Duration },

    #[error("remote command in pod {pod} exited with status {status}: {stderr}")]
    Failed {
        pod: String,
        status: i32,
        stderr: String,
    },

    #[error("pod {pod} not ready after {waited:?}")]
    NotReady { pod: String, waited: Duration },
}

/// Remote command execution against a live pod. The engine's only
/// out-of-band I/O goes through this seam.
pub trait PodExec {
    fn exec(&self, pod: &Pod, argv: &[String]) -> Result<ExecOutput, ExecError>;
}

/// `kubectl exec`-backed implementation.
///
/// Streams are drained on helper threads while the child is polled against
/// a single top-level deadline; a child that outlives the deadline is
/// killed and reported as a timeout.
#[derive(Debug, Clone)]
pub struct KubectlExec {
    kubectl: PathBuf,
    namespace: String,
    kubeconfig: Option<PathBuf>,
    timeout: Duration,
}

impl KubectlExec {
    pub fn new(
        kubectl: PathBuf,
        namespace: impl Into<String>,
        kubeconfig: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            kubectl,
            namespace: namespace.into(),
            kubeconfig,
            timeout,
        }
    }

    fn build_argv(&self, pod: &Pod, argv: &[String]) -> Vec<String> {
        let mut cmd = Vec::with_capacity(argv.len() + 8);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.push("--kubeconfig".to_string());
            cmd.push(kubeconfig.display().to_string());
        }
        cmd.push("-n".to_string());
        cmd.push(self.namespace.clone());
        cmd.push("exec".to_string());
        cmd.push(pod.name.clone());
        cmd.push("--".to_string());
        cmd.extend(argv.iter().cloned());
        cmd
    }
}

impl PodExec for KubectlExec {
    fn exec(&self, pod: &Pod, argv: &[String]) -> Result<ExecOutput, ExecError> {
        let full = self.build_argv(pod, argv);
        debug!(pod = %pod.name, cmd = %full.join(" "), "kubectl exec");

        let mut cmd = Command::new(&self.kubectl);
        cmd.args(&full)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.kubectl.display().to_string(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || read_stream(stdout));
        let err_handle = thread::spawn(move || read_stream(stderr));

        let started = Instant::now();
        let status = loop {
            match child.try_wait().map_err(ExecError::Capture)? {
                Some(status) => break status,
                None => {
                    if started.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExecError::Timeout {
                            pod: pod.name.clone(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        };

        let stdout = join_stream(out_handle)?;
        let stderr = join_stream(err_handle)?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}

fn read_stream<R: Read>(stream: Option<R>) -> std::io::Result<String> {
    let mut s = String::new();
    if let Some(mut stream) = stream {
        stream.read_to_string(&mut s)?;
    }
    Ok(s)
}

fn join_stream(handle: thread::JoinHandle<std::io::Result<String>>) -> Result<String, ExecError> {
    match handle.join() {
        Ok(Ok(s)) => Ok(s),
        Ok(Err(err)) => Err(ExecError::Capture(err)),
        Err(_) => Ok(String::new()),
    }
}

/// Bounded readiness probe: a trivial exec retried until `deadline`
/// elapses. Replaces unbounded watch-based waiting; a pod that never
/// becomes ready surfaces as a typed error instead of a hang.
pub fn wait_ready(
    exec: &dyn PodExec,
    pod: &Pod,
    deadline: Duration,
    interval: Duration,
) -> Result<(), ExecError> {
    let started = Instant::now();
    let probe = ["true".to_string()];

    loop {
        match exec.exec(pod, &probe) {
            Ok(out) if out.success() => return Ok(()),
            Ok(_) | Err(_) if started.elapsed() < deadline => thread::sleep(interval),
            Ok(_) => {
                return Err(ExecError::NotReady {
                    pod: pod.name.clone(),
                    waited: started.elapsed(),
                });
            }
            Err(err) => {
                debug!(pod = %pod.name, %err, "readiness probe failed");
                return Err(ExecError::NotReady {
                    pod: pod.name.clone(),
                    waited: started.elapsed(),
                });
            }
        }
    }
}
