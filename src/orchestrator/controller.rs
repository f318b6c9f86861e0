//! Request lifecycle controller.
//!
//! Owns the single in-flight network job and emits events for presentation layers.

use crate::engine::RosterClient;
use crate::model::{InfoEvent, Phase, RosterEvent, Student};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Fetch,
    Upload(Vec<Student>),
    Quit,
}

enum JobOutcome {
    Fetched(Vec<Student>),
    Uploaded { count: usize, status: u16 },
}

/// Internal handle for a running job.
struct JobCtx {
    phase: Phase,
    handle: Option<tokio::task::JoinHandle<Result<JobOutcome>>>,
}

fn start_job(
    client: &RosterClient,
    cmd: UiCommand,
    event_tx: &UnboundedSender<RosterEvent>,
) -> Option<JobCtx> {
    let client = client.clone();
    let (phase, handle) = match cmd {
        UiCommand::Fetch => (
            Phase::Fetching,
            tokio::spawn(async move { client.fetch_students().await.map(JobOutcome::Fetched) }),
        ),
        UiCommand::Upload(students) => (
            Phase::Uploading,
            tokio::spawn(async move {
                let status = client.upload_students(&students).await?;
                Ok(JobOutcome::Uploaded {
                    count: students.len(),
                    status: status.as_u16(),
                })
            }),
        ),
        UiCommand::Quit => return None,
    };
    let _ = event_tx.send(RosterEvent::PhaseStarted { phase });
    Some(JobCtx {
        phase,
        handle: Some(handle),
    })
}

/// Run jobs requested by UI commands one at a time and emit events back to presentation layers.
///
/// A command arriving while a job is in flight is refused, not queued. Quit waits for the
/// in-flight job so its result is still reported.
pub(crate) async fn run_controller(
    client: RosterClient,
    fetch_on_launch: bool,
    event_tx: UnboundedSender<RosterEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut job = if fetch_on_launch {
        start_job(&client, UiCommand::Fetch, &event_tx)
    } else {
        None
    };
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Quit) | None => {
                        if job.is_none() {
                            break;
                        }
                        quit_pending = true;
                    }
                    Some(cmd) => {
                        if let Some(ctx) = &job {
                            tracing::debug!(phase = ?ctx.phase, ?cmd, "refusing command while busy");
                            let _ = event_tx.send(RosterEvent::Info(InfoEvent::Busy { phase: ctx.phase }));
                        } else {
                            job = start_job(&client, cmd, &event_tx);
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut job {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    let phase = job.as_ref().map(|ctx| ctx.phase).unwrap_or(Phase::Idle);
                    job = None;
                    match join_res {
                        Ok(Ok(JobOutcome::Fetched(students))) => {
                            let _ = event_tx.send(RosterEvent::Fetched { students });
                        }
                        Ok(Ok(JobOutcome::Uploaded { count, status })) => {
                            let _ = event_tx.send(RosterEvent::Uploaded { count, status });
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(?phase, "request failed: {e:#}");
                            let _ = event_tx.send(RosterEvent::Info(InfoEvent::Failed {
                                phase,
                                error: format!("{e:#}"),
                            }));
                        }
                        Err(e) => {
                            let _ = event_tx.send(RosterEvent::Info(InfoEvent::Message(format!(
                                "Request task join failed: {e}"
                            ))));
                        }
                    }
                    let _ = event_tx.send(RosterEvent::PhaseStarted { phase: Phase::Idle });
                    if quit_pending {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
