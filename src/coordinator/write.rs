use crate::channels::{fifo, Channel, ChannelKind, ChannelState};
use crate::error::{io_error, SimulationError};
use crate::logging::RunLog;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug)]
pub enum WriteOutcome {
    Completed { bytes: usize },
    /// The model never opened the pipe before teardown released the writer.
    Released,
    Failed(io::Error),
    Panicked,
}

#[derive(Debug)]
pub struct WriteReport {
    pub channel: String,
    pub outcome: WriteOutcome,
}

impl WriteReport {
    pub fn into_result(self) -> Result<(), SimulationError> {
        match self.outcome {
            WriteOutcome::Completed { .. } | WriteOutcome::Released => Ok(()),
            WriteOutcome::Failed(source) => Err(SimulationError::WriteFailed {
                channel: self.channel,
                source,
            }),
            WriteOutcome::Panicked => Err(SimulationError::WorkerPanicked {
                channel: self.channel,
            }),
        }
    }
}

struct PendingWrite {
    channel: Arc<Channel>,
    handle: JoinHandle<WriteOutcome>,
}

/// One writer thread per input channel, all in flight at once, since the
/// model opens its inputs in an order we do not control.
pub struct WriteCoordinator {
    pending: Vec<PendingWrite>,
    finished: Vec<WriteReport>,
    log: RunLog,
}

impl WriteCoordinator {
    pub fn dispatch(
        payloads: Vec<(Arc<Channel>, String)>,
        log: &RunLog,
    ) -> Result<Self, SimulationError> {
        let mut coordinator = Self {
            pending: Vec::with_capacity(payloads.len()),
            finished: Vec::new(),
            log: log.clone(),
        };
        for (channel, payload) in payloads {
            channel.mark(ChannelState::OpenPending);
            let worker_channel = channel.clone();
            let handle = thread::Builder::new()
                .name(format!("write-{}", channel.name()))
                .spawn(move || write_channel(&worker_channel, payload.as_bytes()))
                .map_err(|source| io_error(channel.path(), source))?;
            coordinator.pending.push(PendingWrite { channel, handle });
        }
        Ok(coordinator)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Joins the writers of regular-file channels, which never block on the
    /// model and must be complete before it starts.
    pub fn join_regular_files(&mut self) -> Result<(), SimulationError> {
        let (files, pipes): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.channel.kind() == ChannelKind::File);
        self.pending = pipes;

        let mut first_error = None;
        for pending in files {
            let report = self.join_one(pending);
            if let Err(err) = report.into_result() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Joins every remaining writer. Pipe writers only return once the model
    /// read them or teardown released them.
    pub fn join_all(mut self) -> Vec<WriteReport> {
        let pending = std::mem::take(&mut self.pending);
        for pending in pending {
            let report = self.join_one(pending);
            self.finished.push(report);
        }
        std::mem::take(&mut self.finished)
    }

    fn join_one(&self, pending: PendingWrite) -> WriteReport {
        let name = pending.channel.name().to_string();
        let outcome = pending.handle.join().unwrap_or(WriteOutcome::Panicked);
        match &outcome {
            WriteOutcome::Completed { bytes } => self
                .log
                .info("write.completed", &format!("channel={name} bytes={bytes}")),
            WriteOutcome::Released => self.log.warn(
                "write.released",
                &format!("channel={name} model never opened the channel"),
            ),
            WriteOutcome::Failed(err) => self
                .log
                .error("write.failed", &format!("channel={name} error={err}")),
            WriteOutcome::Panicked => self
                .log
                .error("write.failed", &format!("channel={name} writer panicked")),
        }
        WriteReport {
            channel: name,
            outcome,
        }
    }
}

fn write_channel(channel: &Channel, payload: &[u8]) -> WriteOutcome {
    let opened = match channel.kind() {
        ChannelKind::Pipe => fifo::open_write_when_read(channel.path(), || channel.was_released()),
        ChannelKind::File => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(channel.path())
            .map(Some),
    };
    let result = opened.and_then(|file| match file {
        Some(mut file) => {
            file.write_all(payload)?;
            file.flush()?;
            Ok(true)
        }
        None => Ok(false),
    });
    match result {
        Ok(true) => {
            channel.mark(ChannelState::Completed);
            WriteOutcome::Completed {
                bytes: payload.len(),
            }
        }
        Ok(false) => WriteOutcome::Released,
        Err(_) if channel.was_released() => WriteOutcome::Released,
        Err(err) => WriteOutcome::Failed(err),
    }
}
