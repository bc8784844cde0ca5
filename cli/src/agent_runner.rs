//! Runs the agent command once per submission.
//!
//! The payload is written to the child's stdin, and every line the child prints (stdout and
//! stderr) becomes an [`AgentEvent::Output`]. Without a command the runner echoes the payload,
//! which keeps the composer usable on its own.

use std::process::Stdio;

use anyhow::Context;
use draftpad_protocol::AgentEvent;
use draftpad_protocol::AgentOp;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;

/// Serve ops until the UI drops its sender.
pub async fn run_agent_loop(
    command: Option<String>,
    mut op_rx: UnboundedReceiver<AgentOp>,
    event_tx: UnboundedSender<AgentEvent>,
) {
    while let Some(op) = op_rx.recv().await {
        let submission = match op {
            AgentOp::Submit(submission) => submission,
            AgentOp::Stop => {
                tracing::debug!("stop requested with no task running");
                continue;
            }
        };

        let Some(command) = command.as_deref() else {
            for line in submission.payload.lines() {
                let line = line.to_string();
                send(&event_tx, AgentEvent::Output { line });
            }
            send(&event_tx, AgentEvent::Finished { success: true });
            continue;
        };

        match run_task(command, submission.payload, &mut op_rx, &event_tx).await {
            Ok(success) => send(&event_tx, AgentEvent::Finished { success }),
            Err(err) => {
                tracing::warn!("agent task failed: {err:#}");
                let message = format!("{err:#}");
                send(&event_tx, AgentEvent::Error { message });
            }
        }
    }
}

/// Returns whether the child exited successfully. A stopped task counts as unsuccessful.
async fn run_task(
    command: &str,
    payload: String,
    op_rx: &mut UnboundedReceiver<AgentOp>,
    event_tx: &UnboundedSender<AgentEvent>,
) -> anyhow::Result<bool> {
    let mut child = spawn_agent(command)?;
    let mut stdin = child.stdin.take().context("agent stdin unavailable")?;
    let stdout = child.stdout.take().context("agent stdout unavailable")?;
    let stderr = child.stderr.take().context("agent stderr unavailable")?;

    // Written from a separate task so a child that never reads stdin cannot stall the loop.
    tokio::spawn(async move {
        if let Err(err) = stdin.write_all(payload.as_bytes()).await {
            tracing::debug!("agent did not read its input: {err}");
        }
    });

    let mut stdout = BufReader::new(stdout).lines();
    let mut stderr = BufReader::new(stderr).lines();
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            line = stdout.next_line(), if stdout_open => {
                stdout_open = forward_line(line, event_tx);
            }
            line = stderr.next_line(), if stderr_open => {
                stderr_open = forward_line(line, event_tx);
            }
            op = op_rx.recv() => match op {
                Some(AgentOp::Submit(_)) => {
                    tracing::warn!("dropping submission while a task is running");
                }
                Some(AgentOp::Stop) | None => {
                    stop(&mut child).await;
                    return Ok(false);
                }
            },
        }
    }

    let status = child.wait().await.context("wait for agent")?;
    tracing::info!(code = ?status.code(), "agent task finished");
    Ok(status.success())
}

fn spawn_agent(command: &str) -> anyhow::Result<Child> {
    let argv = shlex::split(command)
        .filter(|argv| !argv.is_empty())
        .with_context(|| format!("cannot parse agent command `{command}`"))?;
    let program = which::which(&argv[0])
        .with_context(|| format!("agent command `{}` not found", argv[0]))?;

    Command::new(program)
        .args(&argv[1..])
        .kill_on_drop(true)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start `{command}`"))
}

/// Returns `false` once the stream is finished.
fn forward_line(
    line: std::io::Result<Option<String>>,
    event_tx: &UnboundedSender<AgentEvent>,
) -> bool {
    match line {
        Ok(Some(line)) => {
            send(event_tx, AgentEvent::Output { line });
            true
        }
        Ok(None) => false,
        Err(err) => {
            tracing::warn!("failed to read agent output: {err}");
            false
        }
    }
}

async fn stop(child: &mut Child) {
    tracing::info!("stopping agent task");
    if let Err(err) = child.kill().await {
        tracing::warn!("failed to kill agent: {err}");
    }
}

fn send(event_tx: &UnboundedSender<AgentEvent>, event: AgentEvent) {
    if event_tx.send(event).is_err() {
        tracing::debug!("dropping agent event after UI exit");
    }
}
