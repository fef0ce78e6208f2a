//! Multi-stage process pipelines with concurrent stderr draining.
//!
//! A [`Pipeline`] is a non-empty chain of commands where each stage's stdout
//! feeds the next stage's stdin. Spawning it yields a [`RunningPipeline`]
//! that reads like the last stage's stdout; waiting on it reaps every stage
//! and reports per-stage status plus the stderr each stage produced.
//!
//! Stderr of every stage is read by its own thread for the whole lifetime of
//! the pipeline, so a program writing heavily to stderr never blocks while
//! the caller is busy consuming stdout.

use std::fmt;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, warn};

use crate::config::ToolEnvironment;
use crate::constants::{SIGNAL_EXIT_BASE, STDERR_DRAIN_TIMEOUT};
use crate::error::PipelineError;

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated command line. No quoting is supported.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Ordered, non-empty chain of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<CommandSpec>,
}

impl Pipeline {
    pub fn new(first: CommandSpec) -> Self {
        Self { stages: vec![first] }
    }

    /// Single-stage pipeline from a whitespace-separated command line.
    ///
    /// An empty line yields a stage with an empty program name, which fails
    /// to resolve at spawn time like any other missing tool.
    pub fn cmd(line: &str) -> Self {
        Self::new(CommandSpec::parse(line).unwrap_or_else(|| CommandSpec::new("", Vec::<String>::new())))
    }

    pub fn from_stages(stages: Vec<CommandSpec>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }
        Ok(Self { stages })
    }

    /// Append a stage reading this pipeline's output.
    pub fn pipe(mut self, next: CommandSpec) -> Self {
        self.stages.push(next);
        self
    }

    pub fn stages(&self) -> &[CommandSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Program names of all stages, in order.
    pub fn programs(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.program.as_str())
    }

    /// Spawn every stage.
    ///
    /// All programs are resolved before anything is spawned, so a missing
    /// tool leaves no processes behind.
    pub fn spawn(&self, tools: &ToolEnvironment) -> Result<RunningPipeline, PipelineError> {
        let resolved = self
            .stages
            .iter()
            .map(|spec| {
                tools
                    .find_program(&spec.program)
                    .map(|path| (spec, path))
                    .ok_or_else(|| PipelineError::MissingTool(spec.program.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stages: Vec<Stage> = Vec::with_capacity(resolved.len());
        let mut upstream: Option<ChildStdout> = None;

        for (index, (spec, path)) in resolved.into_iter().enumerate() {
            let stdin = match upstream.take() {
                Some(stdout) => Stdio::from(stdout),
                None => Stdio::null(),
            };

            let mut command = Command::new(&path);
            command
                .args(&spec.args)
                .env_clear()
                .envs(tools.vars())
                .stdin(stdin)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let spawned = command.spawn();
            // The command owns our copy of the upstream pipe end; dropping it
            // leaves the downstream child as the only reader, so upstream
            // stages see EPIPE once it exits.
            drop(command);

            let mut child = match spawned {
                Ok(child) => child,
                Err(source) => {
                    abort_stages(stages);
                    return Err(PipelineError::Spawn {
                        command: spec.to_string(),
                        source,
                    });
                }
            };

            debug!("Spawned stage {} (pid {}): {}", index + 1, child.id(), spec);

            upstream = child.stdout.take();
            let drain = child.stderr.take().map(|stderr| spawn_drain(index, stderr));
            stages.push(Stage {
                command: spec.to_string(),
                child,
                drain,
            });
        }

        Ok(RunningPipeline { stages, stdout: upstream })
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

struct Stage {
    command: String,
    child: Child,
    drain: Option<Receiver<io::Result<Vec<u8>>>>,
}

fn spawn_drain(index: usize, mut stderr: ChildStderr) -> Receiver<io::Result<Vec<u8>>> {
    let (sender, receiver) = bounded(1);
    let spawned = thread::Builder::new()
        .name(format!("stderr-drain-{}", index + 1))
        .spawn(move || {
            let mut buffer = Vec::new();
            let result = stderr.read_to_end(&mut buffer).map(|_| buffer);
            // the receiver may have given up waiting
            let _ = sender.send(result);
        });
    if let Err(e) = spawned {
        warn!("Failed to start stderr drain for stage {}: {}", index + 1, e);
    }
    receiver
}

fn abort_stages(stages: Vec<Stage>) {
    for mut stage in stages {
        let _ = stage.child.kill();
        let _ = stage.child.wait();
    }
}

/// A spawned pipeline. Reading from it reads the last stage's stdout.
pub struct RunningPipeline {
    stages: Vec<Stage>,
    stdout: Option<ChildStdout>,
}

impl Read for RunningPipeline {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }
}

impl RunningPipeline {
    /// Release the output stream, reap every stage and gather stderr.
    ///
    /// A stage that cannot be reaped reports exit code -1, with the reason
    /// appended to its stderr.
    pub fn wait(mut self) -> PipelineOutcome {
        // An unread remainder must not keep the last stage blocked.
        drop(self.stdout.take());

        let statuses: Vec<io::Result<ExitStatus>> = self.stages.iter_mut().map(|stage| stage.child.wait()).collect();

        let stages = self
            .stages
            .into_iter()
            .zip(statuses)
            .map(|(stage, status)| stage_status(stage.command, status, stage.drain))
            .collect();

        PipelineOutcome { stages }
    }
}

fn stage_status(
    command: String,
    status: io::Result<ExitStatus>,
    drain: Option<Receiver<io::Result<Vec<u8>>>>,
) -> StageStatus {
    let mut stderr = collect_drain(drain);
    let status = match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            warn!("Failed to wait for `{}`: {}", command, e);
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!("<failed to wait for stage: {}>\n", e));
            -1
        }
    };
    StageStatus { command, status, stderr }
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_EXIT_BASE + signal,
        (None, None) => -1,
    }
}

fn collect_drain(drain: Option<Receiver<io::Result<Vec<u8>>>>) -> String {
    let Some(receiver) = drain else {
        return String::new();
    };
    match receiver.recv_timeout(STDERR_DRAIN_TIMEOUT) {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(e)) => format!("<failed to read stderr: {}>\n", e),
        Err(RecvTimeoutError::Timeout) => {
            warn!("Timed out waiting for stderr drain");
            format!("<stderr still open after {}s>\n", STDERR_DRAIN_TIMEOUT.as_secs())
        }
        Err(RecvTimeoutError::Disconnected) => String::new(),
    }
}

/// Exit status and stderr of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub command: String,
    /// Exit code, or 128 + signal number when the stage was killed.
    pub status: i32,
    pub stderr: String,
}

impl StageStatus {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Result of a finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub stages: Vec<StageStatus>,
}

impl PipelineOutcome {
    /// The last stage's exit code; earlier failures do not change it.
    pub fn exit_code(&self) -> i32 {
        self.stages.last().map(|s| s.status).unwrap_or(-1)
    }

    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Whether any stage wrote to stderr.
    pub fn has_stderr(&self) -> bool {
        self.stages.iter().any(|s| !s.stderr.is_empty())
    }

    /// Stderr of all stages as labeled blocks, in stage order.
    pub fn stderr_text(&self) -> String {
        let total = self.stages.len();
        let mut text = String::new();
        for (index, stage) in self.stages.iter().enumerate() {
            text.push_str(&format!(
                "=== stage {}/{} (exit {}): {} ===\n",
                index + 1,
                total,
                stage.status,
                stage.command
            ));
            text.push_str(&stage.stderr);
            if !stage.stderr.is_empty() && !stage.stderr.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }
}

/// Run a pipeline to completion, collecting stdout in memory.
///
/// Only for small outputs that need inspecting; archive entries stream.
pub fn run_captured(pipeline: &Pipeline, tools: &ToolEnvironment) -> Result<(Vec<u8>, PipelineOutcome), PipelineError> {
    let mut running = pipeline.spawn(tools)?;
    let mut stdout = Vec::new();
    if let Err(e) = running.read_to_end(&mut stdout) {
        warn!("Failed to read output of `{}`: {}", pipeline.stages()[0], e);
    }
    let outcome = running.wait();
    Ok((stdout, outcome))
}
