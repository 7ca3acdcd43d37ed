//! Command Builder
//!
//! Serializes typed command records into AT command lines.
//!
//! Every record lists its arguments positionally through [`CommandArgs`];
//! [`encode`] is the one place that turns them into text:
//!
//! - no arguments: `AT<name>`
//! - otherwise: `AT<name>=<a1>,<a2>,...`
//! - an absent argument between present ones is left empty (`0,"t",,5`)
//! - absent arguments at the end are dropped, so the modem applies its defaults

use std::fmt::Display;

/// A typed AT command
pub trait AtCommand {
    /// Command name following the `AT` prefix, e.g. `+SQNHTTPCFG`
    fn name(&self) -> &'static str;

    /// Append positional arguments
    fn write_args(&self, args: &mut CommandArgs) {
        let _ = args;
    }

    /// Marker that completes the response to this command
    fn completion(&self) -> &'static str {
        super::OK_MARKER
    }
}

/// Positional argument list for one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    args: Vec<Option<String>>,
}

impl CommandArgs {
    /// Create an empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Unquoted value (numbers, enum codes)
    pub fn int(&mut self, value: impl Display) -> &mut Self {
        self.args.push(Some(value.to_string()));
        self
    }

    /// Double-quoted string value
    pub fn quoted(&mut self, value: &str) -> &mut Self {
        self.args.push(Some(format!("\"{}\"", value)));
        self
    }

    /// Boolean as `0`/`1`
    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.int(u8::from(value))
    }

    /// Absent argument
    pub fn skip(&mut self) -> &mut Self {
        self.args.push(None);
        self
    }

    /// Unquoted value when present
    pub fn opt_int<T: Display>(&mut self, value: Option<T>) -> &mut Self {
        match value {
            Some(v) => self.int(v),
            None => self.skip(),
        }
    }

    /// Quoted value when present
    pub fn opt_quoted(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.quoted(v),
            None => self.skip(),
        }
    }

    /// Flag when present
    pub fn opt_flag(&mut self, value: Option<bool>) -> &mut Self {
        match value {
            Some(v) => self.flag(v),
            None => self.skip(),
        }
    }

    /// Render as the text following `=`; `None` when nothing is present
    fn render(&self) -> Option<String> {
        let last = self.args.iter().rposition(Option::is_some)?;
        let parts: Vec<&str> = self.args[..=last]
            .iter()
            .map(|a| a.as_deref().unwrap_or(""))
            .collect();
        Some(parts.join(","))
    }
}

/// Serialize a command record into its AT command line (without terminator)
pub fn encode<C: AtCommand + ?Sized>(command: &C) -> String {
    let mut args = CommandArgs::new();
    command.write_args(&mut args);
    match args.render() {
        Some(rendered) => format!("AT{}={}", command.name(), rendered),
        None => format!("AT{}", command.name()),
    }
}
