//! Parsing of the lines typed into the terminal client.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use orb_chat_model::{ConversationId, Theme};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Prompts offered on the welcome screen.
pub const SUGGESTED_PROMPTS: [&str; 4] = [
    "Explain artificial intelligence to me",
    "Help me with some Python code",
    "Tell me a short story",
    "Give me some creative ideas",
];

/// One help line per command.
pub const HELP: &[(&str, &str)] = &[
    ("/new", "start a new conversation"),
    ("/list", "list conversations, newest first"),
    ("/select <id>", "switch to a conversation"),
    ("/delete <id>", "delete a conversation"),
    ("/attach <path>", "attach a PDF, PNG or JPEG to the next message"),
    ("/files", "show attached files"),
    ("/clear-files", "remove attached files"),
    ("/search on|off", "toggle web search"),
    ("/theme dark|light", "change the theme"),
    ("/status", "check the backend"),
    ("/help", "show this help"),
    ("/quit", "exit"),
];

/// A line of input, interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A message to submit.
    Prompt(String),
    /// A slash command.
    Command(Command),
    /// Nothing but whitespace.
    Empty,
}

/// The commands of the terminal client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/new`
    New,
    /// `/list`
    List,
    /// `/select <id>`
    Select(ConversationId),
    /// `/delete <id>`
    Delete(ConversationId),
    /// `/attach <path>`
    Attach(PathBuf),
    /// `/files`
    Files,
    /// `/clear-files`
    ClearFiles,
    /// `/search on|off`
    Search(bool),
    /// `/theme dark|light`
    Theme(Theme),
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

/// Error returned for a malformed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The command does not exist.
    Unknown(String),
    /// The command exists but its argument is missing or invalid.
    Usage(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unknown(name) => {
                write!(f, "unknown command /{name}, try /help")
            }
            ParseError::Usage(usage) => write!(f, "usage: {usage}"),
        }
    }
}

impl StdError for ParseError {}

impl Input {
    /// Interprets a line. Lines starting with `/` are commands; anything
    /// else is a prompt, kept as typed apart from surrounding whitespace.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Input::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Input::Prompt(line.to_owned()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let command = match name {
            "new" => Command::New,
            "list" => Command::List,
            "select" => Command::Select(parse_id(arg, "/select <id>")?),
            "delete" => Command::Delete(parse_id(arg, "/delete <id>")?),
            "attach" if !arg.is_empty() => Command::Attach(PathBuf::from(arg)),
            "attach" => return Err(ParseError::Usage("/attach <path>")),
            "files" => Command::Files,
            "clear-files" => Command::ClearFiles,
            "search" => match arg {
                "on" => Command::Search(true),
                "off" => Command::Search(false),
                _ => return Err(ParseError::Usage("/search on|off")),
            },
            "theme" => arg
                .parse()
                .map(Command::Theme)
                .map_err(|_| ParseError::Usage("/theme dark|light"))?,
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(ParseError::Unknown(name.to_owned())),
        };
        Ok(Input::Command(command))
    }
}

/// Reads the next line from `reader`, including its line ending.
///
/// Returns `None` at the end of input or on a read error. Keep one reader
/// for the whole session: a reader buffers past the line it returns.
pub async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {err}");
            None
        }
    }
}

fn parse_id(
    arg: &str,
    usage: &'static str,
) -> Result<ConversationId, ParseError> {
    arg.parse().map_err(|_| ParseError::Usage(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match Input::parse(line) {
            Ok(Input::Command(command)) => command,
            other => panic!("{line:?} parsed as {other:?}"),
        }
    }

    #[test]
    fn test_prompts() {
        assert_eq!(Input::parse("   "), Ok(Input::Empty));
        assert_eq!(
            Input::parse("  What is Rust?\n"),
            Ok(Input::Prompt("What is Rust?".to_owned()))
        );
        // A slash inside the text does not make a command.
        assert_eq!(
            Input::parse("either/or"),
            Ok(Input::Prompt("either/or".to_owned()))
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(command("/new"), Command::New);
        assert_eq!(command("/list"), Command::List);
        assert_eq!(
            command("/select 1700000000000"),
            Command::Select(ConversationId::from_raw(1_700_000_000_000))
        );
        assert_eq!(
            command("/delete  42 "),
            Command::Delete(ConversationId::from_raw(42))
        );
        assert_eq!(
            command("/attach ~/My Documents/scan.pdf"),
            Command::Attach(PathBuf::from("~/My Documents/scan.pdf"))
        );
        assert_eq!(command("/files"), Command::Files);
        assert_eq!(command("/clear-files"), Command::ClearFiles);
        assert_eq!(command("/search on"), Command::Search(true));
        assert_eq!(command("/search off"), Command::Search(false));
        assert_eq!(command("/theme light"), Command::Theme(Theme::Light));
        assert_eq!(command("/status"), Command::Status);
        assert_eq!(command("/help"), Command::Help);
        assert_eq!(command("/quit"), Command::Quit);
        assert_eq!(command("/exit"), Command::Quit);
    }

    #[tokio::test]
    async fn test_read_line_keeps_buffered_lines() {
        let piped: &[u8] = b"/help\n/search on\nWhat is Rust?";
        let mut input = tokio::io::BufReader::new(piped);
        let mut lines = vec![];
        while let Some(line) = read_line(&mut input).await {
            lines.push(Input::parse(&line).unwrap());
        }
        assert_eq!(
            lines,
            vec![
                Input::Command(Command::Help),
                Input::Command(Command::Search(true)),
                Input::Prompt("What is Rust?".to_owned()),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Input::parse("/frobnicate"),
            Err(ParseError::Unknown("frobnicate".to_owned()))
        );
        assert_eq!(
            Input::parse("/select abc"),
            Err(ParseError::Usage("/select <id>"))
        );
        assert_eq!(
            Input::parse("/attach"),
            Err(ParseError::Usage("/attach <path>"))
        );
        assert_eq!(
            Input::parse("/search maybe"),
            Err(ParseError::Usage("/search on|off"))
        );
        assert_eq!(
            Input::parse("/theme blue"),
            Err(ParseError::Usage("/theme dark|light"))
        );
    }
}
