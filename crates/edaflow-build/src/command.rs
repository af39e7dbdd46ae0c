//! Command lines as typed argument tokens
//!
//! Commands are kept as token sequences until the graph is serialized, so that
//! quoting is decided in exactly one place.

use std::borrow::Cow;
use std::fmt;

/// One command line token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arg {
    /// A plain word; quoted on output if it contains shell metacharacters
    Literal(String),
    /// A file path; quoted like a literal
    Path(String),
    /// A shell fragment or make variable reference, emitted verbatim
    Raw(String),
}

impl Arg {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn path(value: impl Into<String>) -> Self {
        Self::Path(value.into())
    }

    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    /// Render the token for a make recipe line
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Raw(text) => Cow::Borrowed(text),
            Self::Literal(text) | Self::Path(text) => {
                if is_shell_safe(text) {
                    Cow::Borrowed(text)
                } else {
                    Cow::Owned(shell_quote(text).replace('$', "$$"))
                }
            }
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Self::Literal(value.clone())
    }
}

fn is_shell_safe(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c))
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// A command line: program followed by arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Command {
    args: Vec<Arg>,
}

impl Command {
    /// Start a command with the given program name
    pub fn new(program: impl Into<Arg>) -> Self {
        Self {
            args: vec![program.into()],
        }
    }

    /// Start a command whose leading token is a raw shell fragment
    pub fn raw(fragment: impl Into<String>) -> Self {
        Self {
            args: vec![Arg::raw(fragment)],
        }
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.args.push(Arg::path(path));
        self
    }

    /// Append a flag followed by a path
    pub fn flag_path(self, flag: &str, path: impl Into<String>) -> Self {
        self.arg(flag).path(path)
    }

    pub fn tokens(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Join the tokens for a recipe line, quoting where needed
    pub fn render(&self) -> String {
        self.args
            .iter()
            .map(Arg::render)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
