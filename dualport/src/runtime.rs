use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::dispatcher::TransportDispatcher;
use crate::engine::ProtocolEngine;
use crate::tcp::SocketChip;

/// A handle to the poll task. The task is shutdown when the handle is dropped.
#[derive(Debug)]
pub struct PollTaskHandle {
    tx: tokio::sync::mpsc::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl PollTaskHandle {
    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        let PollTaskHandle { tx, handle } = self;
        drop(tx);
        if let Err(err) = handle.await {
            tracing::warn!("poll task did not exit cleanly: {}", err);
        }
    }

    /// true once the task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the task to stop without waiting for it
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Spawns the poll task onto the runtime. This method can only be called from
/// within the runtime context. Use [`create_poll_task`] and spawn it manually
/// if using outside the Tokio runtime.
///
/// Every `period` the task runs one dispatcher poll followed by one RTU engine step.
pub fn spawn_poll_task<C, E>(
    dispatcher: TransportDispatcher<C, E>,
    period: Duration,
) -> PollTaskHandle
where
    C: SocketChip + 'static,
    E: ProtocolEngine + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let handle = tokio::spawn(create_poll_task(rx, dispatcher, period));
    PollTaskHandle { tx, handle }
}

/// Creates the poll task so that it can be spawned onto a runtime manually.
/// The task exits when `shutdown` receives a value or its sender is dropped.
pub async fn create_poll_task<C, E>(
    shutdown: tokio::sync::mpsc::Receiver<()>,
    dispatcher: TransportDispatcher<C, E>,
    period: Duration,
) where
    C: SocketChip,
    E: ProtocolEngine,
{
    PollTask {
        dispatcher,
        period,
    }
    .run(shutdown)
    .instrument(tracing::info_span!("Modbus-Port-Poll"))
    .await
}

struct PollTask<C, E> {
    dispatcher: TransportDispatcher<C, E>,
    period: Duration,
}

impl<C, E> PollTask<C, E>
where
    C: SocketChip,
    E: ProtocolEngine,
{
    async fn run(&mut self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        tracing::info!("poll task started");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("poll task shutdown");
                    return;
                }
                _ = interval.tick() => {
                    let tick = self.dispatcher.poll();
                    if let Some(err) = tick.fault {
                        tracing::debug!("poll recovered from: {}", err);
                    }
                    self.dispatcher.poll_engine();
                }
            }
        }
    }
}
