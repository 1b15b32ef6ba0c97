//! Line oriented operator input: the subject prompt and the stop command.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};

use common::{InvalidSubject, SubjectId};

const QUIT_TOKEN: &str = "quit";
const STOP_TOKEN: &str = "stop";

pub const SUBJECT_PROMPT: &str = "Enter ES_ID to start (or 'quit' to exit): ";

#[derive(Debug, PartialEq)]
pub enum Startup {
    Begin(SubjectId),
    Quit,
}

pub fn parse_startup(line: &str) -> Result<Startup, InvalidSubject> {
    if line.trim().eq_ignore_ascii_case(QUIT_TOKEN) {
        return Ok(Startup::Quit);
    }
    SubjectId::new(line).map(Startup::Begin)
}

/// Asks for the subject once. Returns `None` when the operator quit or gave
/// an empty id, in which case `Exiting.` has already been written.
pub fn prompt_subject<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> io::Result<Option<SubjectId>> {
    write!(output, "{}", SUBJECT_PROMPT)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    match parse_startup(&line) {
        Ok(Startup::Begin(subject)) => Ok(Some(subject)),
        Ok(Startup::Quit) => {
            writeln!(output, "Exiting.")?;
            Ok(None)
        }
        Err(e) => {
            writeln!(output, "{}.", e)?;
            writeln!(output, "Exiting.")?;
            Ok(None)
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Prompted {
    Subject(SubjectId),
    Declined,
    Interrupted,
}

/// Waits for the prompt thread's answer unless a stop arrives first.
pub fn wait_for_subject(
    answer: &Receiver<io::Result<Option<SubjectId>>>,
    stop: &Receiver<StopReason>,
) -> io::Result<Prompted> {
    select! {
        recv(answer) -> msg => match msg {
            Ok(Ok(Some(subject))) => Ok(Prompted::Subject(subject)),
            Ok(Ok(None)) => Ok(Prompted::Declined),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "subject prompt ended without an answer",
            )),
        },
        recv(stop) -> _ => Ok(Prompted::Interrupted),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Unknown,
}

pub fn parse_command(line: &str) -> Command {
    if line.trim().eq_ignore_ascii_case(STOP_TOKEN) {
        Command::Stop
    } else {
        Command::Unknown
    }
}

/// Why the session is being stopped. All reasons are handled the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Command,
    EndOfInput,
    Interrupt,
    InputError,
}

/// Reads commands from `input` until a stop is requested or input runs out.
pub fn read_until_stop<R: BufRead>(mut input: R) -> StopReason {
    let mut line = String::new();
    loop {
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => return StopReason::EndOfInput,
            Ok(_) => match parse_command(&line) {
                Command::Stop => return StopReason::Command,
                Command::Unknown => {
                    if !line.trim().is_empty() {
                        info!("Unknown command {:?}, type '{}' to end the session", line.trim(), STOP_TOKEN);
                    }
                }
            },
            Err(e) => {
                warn!("Failed to read command: {}", e);
                return StopReason::InputError;
            }
        }
    }
}

pub fn spawn_command_reader<R>(input: R, tx: Sender<StopReason>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let reason = read_until_stop(input);
        // The receiver may already be gone if an interrupt won the race
        let _ = tx.send(reason);
    })
}
