use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::alarm::model::{AlarmTime, TIME_FORMAT_EXAMPLES, parse_alarm_time};

pub const FAREWELL: &str = "No alarm for you then.";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InputEvent {
    Line(String),
    Interrupted,
    Closed,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PromptOutcome {
    Time(AlarmTime),
    Cancelled,
}

pub trait LineSource {
    fn next_event(&mut self) -> Result<InputEvent>;
}

pub struct ReaderLines<R> {
    reader: R,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_event(&mut self) -> Result<InputEvent> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("failed to read alarm time")?;
        if read == 0 {
            return Ok(InputEvent::Closed);
        }
        Ok(InputEvent::Line(trim_line_ending(line)))
    }
}

fn trim_line_ending(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

pub struct Console {
    sender: Sender<InputEvent>,
    events: Receiver<InputEvent>,
    reader_started: bool,
}

impl Console {
    pub fn install() -> Self {
        let (sender, events) = mpsc::channel();
        let interrupt_sender = sender.clone();
        if let Err(err) = ctrlc::set_handler(move || {
            let _ = interrupt_sender.send(InputEvent::Interrupted);
        }) {
            warn!(error = %err, "unable to install interrupt handler");
        }
        Self {
            sender,
            events,
            reader_started: false,
        }
    }

    fn start_reader(&mut self) {
        if self.reader_started {
            return;
        }
        self.reader_started = true;
        let sender = self.sender.clone();
        thread::spawn(move || {
            let mut lines = ReaderLines::new(io::stdin().lock());
            loop {
                let event = match lines.next_event() {
                    Ok(event) => event,
                    Err(err) => {
                        debug!(error = %err, "stdin reader stopped");
                        InputEvent::Closed
                    }
                };
                let closed = event == InputEvent::Closed;
                if sender.send(event).is_err() || closed {
                    break;
                }
            }
        });
    }

    pub fn interrupted_within(&self, timeout: Duration) -> bool {
        match self.events.recv_timeout(timeout) {
            Ok(event) => event == InputEvent::Interrupted,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl LineSource for Console {
    fn next_event(&mut self) -> Result<InputEvent> {
        self.start_reader();
        self.events
            .recv()
            .context("terminal input channel closed unexpectedly")
    }
}

fn write_question<W: Write>(out: &mut W, quit_keyword: &str) -> Result<()> {
    writeln!(
        out,
        "When should the alarm ring? (Type \"{quit_keyword}\" to stop the program)"
    )?;
    out.flush()?;
    Ok(())
}

fn write_format_hint<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "You must use one of these time formats:")?;
    for example in TIME_FORMAT_EXAMPLES {
        writeln!(out, "{example}")?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn prompt_alarm_time<L, W>(lines: &mut L, out: &mut W, quit_keyword: &str) -> Result<PromptOutcome>
where
    L: LineSource + ?Sized,
    W: Write,
{
    let quit_keyword_lower = quit_keyword.to_lowercase();
    write_question(out, quit_keyword)?;
    loop {
        let line = match lines.next_event()? {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted | InputEvent::Closed => return Ok(PromptOutcome::Cancelled),
        };

        if let Some(time) = parse_alarm_time(&line) {
            return Ok(PromptOutcome::Time(time));
        }
        if line.to_lowercase().contains(&quit_keyword_lower) {
            return Ok(PromptOutcome::Cancelled);
        }

        debug!(input = %line, "rejected alarm time");
        write_format_hint(out)?;
        write_question(out, quit_keyword)?;
    }
}
