use crate::channels::fifo::{self, PipeReadError};
use crate::channels::{Channel, ChannelKind, ChannelState};
use crate::config::ParseRule;
use crate::error::{io_error, SimulationError};
use crate::logging::RunLog;
use crate::results::{parse_table, ResultTable};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub channel: Arc<Channel>,
    pub rule: ParseRule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Table(ResultTable),
    /// Raw report bytes, decoded later by the report parser.
    Report(Vec<u8>),
    Discarded,
    /// A regular-file output the model did not write.
    Absent,
}

#[derive(Debug)]
pub struct ChannelRead {
    pub channel: String,
    pub result: Result<ReadOutcome, SimulationError>,
}

/// Per-channel results in the order the reads finished.
#[derive(Debug, Default)]
pub struct ReadReport {
    reads: Vec<ChannelRead>,
}

impl ReadReport {
    pub fn reads(&self) -> &[ChannelRead] {
        &self.reads
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelRead> {
        self.reads.iter().find(|read| read.channel == channel)
    }

    pub fn first_error(&self) -> Option<&SimulationError> {
        self.reads.iter().find_map(|read| read.result.as_ref().err())
    }

    pub fn failed_channels(&self) -> Vec<&str> {
        self.reads
            .iter()
            .filter(|read| read.result.is_err())
            .map(|read| read.channel.as_str())
            .collect()
    }

    pub fn merge(&mut self, other: ReadReport) {
        self.reads.extend(other.reads);
    }

    /// Every outcome by channel, or the first error in completion order.
    pub fn into_outcomes(self) -> Result<BTreeMap<String, ReadOutcome>, SimulationError> {
        let mut outcomes = BTreeMap::new();
        let mut first_error = None;
        for read in self.reads {
            match read.result {
                Ok(outcome) => {
                    outcomes.insert(read.channel, outcome);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }
}

/// Reads every output channel on its own thread, each wait bounded by the
/// read timeout. All reads finish before any failure is reported.
#[derive(Debug, Clone)]
pub struct ReadCoordinator {
    timeout: Duration,
    log: RunLog,
}

impl ReadCoordinator {
    pub fn new(timeout: Duration, log: &RunLog) -> Self {
        Self {
            timeout,
            log: log.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn drain(&self, requests: Vec<ReadRequest>) -> ReadReport {
        let (tx, rx) = mpsc::channel::<ChannelRead>();
        let mut report = ReadReport::default();
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let name = request.channel.name().to_string();
            let path = request.channel.path().to_path_buf();
            let tx = tx.clone();
            let timeout = self.timeout;
            let spawned = thread::Builder::new()
                .name(format!("read-{name}"))
                .spawn(move || {
                    let result = read_channel(&request.channel, &request.rule, timeout);
                    let _ = tx.send(ChannelRead {
                        channel: request.channel.name().to_string(),
                        result,
                    });
                });
            match spawned {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => report.reads.push(ChannelRead {
                    channel: name,
                    result: Err(io_error(&path, source)),
                }),
            }
        }
        drop(tx);

        for read in rx {
            self.log_read(&read);
            report.reads.push(read);
        }
        for (name, handle) in handles {
            if handle.join().is_err() {
                self.log
                    .error("read.failed", &format!("channel={name} reader panicked"));
                report.reads.push(ChannelRead {
                    channel: name.clone(),
                    result: Err(SimulationError::WorkerPanicked { channel: name }),
                });
            }
        }
        report
    }

    fn log_read(&self, read: &ChannelRead) {
        let channel = &read.channel;
        match &read.result {
            Ok(ReadOutcome::Table(table)) => self.log.info(
                "read.completed",
                &format!("channel={channel} rows={}", table.row_count()),
            ),
            Ok(ReadOutcome::Report(raw)) => self.log.info(
                "read.completed",
                &format!("channel={channel} report_bytes={}", raw.len()),
            ),
            Ok(ReadOutcome::Discarded) => self
                .log
                .debug("read.completed", &format!("channel={channel} discarded")),
            Ok(ReadOutcome::Absent) => self
                .log
                .debug("read.completed", &format!("channel={channel} absent")),
            Err(err) if err.is_timeout() => self
                .log
                .warn("read.timeout", &format!("channel={channel} {err}")),
            Err(err) => self
                .log
                .error("read.failed", &format!("channel={channel} {err}")),
        }
    }
}

fn read_channel(
    channel: &Channel,
    rule: &ParseRule,
    timeout: Duration,
) -> Result<ReadOutcome, SimulationError> {
    let payload = match channel.kind() {
        ChannelKind::Pipe => {
            fifo::read_pipe(channel.path(), timeout).map_err(|err| match err {
                PipeReadError::TimedOut => SimulationError::SimulationTimeout {
                    channel: channel.name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                },
                PipeReadError::Io(source) => io_error(channel.path(), source),
            })?
        }
        ChannelKind::File => match fs::read(channel.path()) {
            Ok(payload) => payload,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ReadOutcome::Absent),
            Err(err) => return Err(io_error(channel.path(), err)),
        },
    };
    channel.mark(ChannelState::Completed);

    match rule {
        ParseRule::Discard => {
            // the model appends to regular outputs across runs
            if channel.kind() == ChannelKind::File {
                let _ = fs::remove_file(channel.path());
            }
            Ok(ReadOutcome::Discarded)
        }
        ParseRule::Report => Ok(ReadOutcome::Report(payload)),
        ParseRule::Table { skip_lines, index } => {
            let text = String::from_utf8_lossy(&payload);
            parse_table(channel.name(), &text, *skip_lines, index.as_deref())
                .map(ReadOutcome::Table)
        }
    }
}
