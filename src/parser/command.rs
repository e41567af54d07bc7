//! Trace protocol commands.
//!
//! Each input line is one whitespace-tokenized command. Parsing a line into
//! a [`Command`] checks arity and number syntax only; what a command does to
//! the model is decided by the handlers in `trace_parser`.

use crate::model::{DescriptionContent, DescriptionKind, LineKind};
use crate::utils::error::ParseError;
use log::debug;

/// Producer/consumer ids of the extended CRE form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    pub producer: i64,
    pub producer_owner: Option<u32>,
    pub consumer: i64,
    pub consumer_owner: Option<u32>,
}

/// One parsed input line
///
/// Times are raw, before the TIME divisor is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Cpu { id: u32, name: String },
    Create { kind: LineKind, id: i64, time: f64, port: Option<PortSpec> },
    Delete { kind: LineKind, id: i64, time: f64 },
    Start { kind: LineKind, id: i64, time: f64, value: Option<f64> },
    Stop { kind: LineKind, id: i64, time: f64, size: Option<f64> },
    Occurrence { kind: LineKind, id: i64, time: f64 },
    Time { time: f64 },
    Value { kind: LineKind, id: i64, value: f64 },
    Describe { id: i64, content: DescriptionContent },
    Name { kind: LineKind, id: i64, name: String },
    DescriptionName { id: i64, name: String },
    TimeUnit { ticks_per_sec: f64 },
    Speed { clocks_per_sec: f64 },
    MemSpeed { clocks_per_sec: f64 },
    End,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    ///
    /// With `strict`, tokens left over after a fixed-arity command are an
    /// error instead of being ignored.
    pub fn parse(line: usize, text: &str, strict: bool) -> Result<Option<Command>, ParseError> {
        let mut tokens = Tokens::new(text, line);
        let Some(name) = tokens.next() else {
            return Ok(None);
        };

        let command = match name.to_ascii_uppercase().as_str() {
            "CPU" => {
                tokens.command = "CPU";
                let first = tokens.required("name")?;
                match tokens.remainder() {
                    Some(rest) => match parse_integer(first, line) {
                        Ok(id) => Command::Cpu {
                            id: to_owner_id(id, first, line)?,
                            name: rest.to_string(),
                        },
                        // Legacy form with a multi-word name
                        Err(_) => Command::Cpu {
                            id: 0,
                            name: format!("{} {}", first, rest),
                        },
                    },
                    None => Command::Cpu {
                        id: 0,
                        name: first.to_string(),
                    },
                }
            }
            "CRE" => {
                tokens.command = "CRE";
                let (kind, id, time) = tokens.kind_id_time()?;
                let extra: Vec<&str> = std::iter::from_fn(|| tokens.next()).collect();
                let port = match extra.as_slice() {
                    [] => None,
                    [producer, consumer] => Some(PortSpec {
                        producer: parse_integer(producer, line)?,
                        producer_owner: None,
                        consumer: parse_integer(consumer, line)?,
                        consumer_owner: None,
                    }),
                    [producer, producer_owner, consumer, consumer_owner] => Some(PortSpec {
                        producer: parse_integer(producer, line)?,
                        producer_owner: Some(parse_owner(producer_owner, line)?),
                        consumer: parse_integer(consumer, line)?,
                        consumer_owner: Some(parse_owner(consumer_owner, line)?),
                    }),
                    other => {
                        return Err(ParseError::InvalidPortForm {
                            line,
                            found: other.len(),
                        })
                    }
                };
                Command::Create { kind, id, time, port }
            }
            "DEL" => {
                tokens.command = "DEL";
                let (kind, id, time) = tokens.kind_id_time()?;
                Command::Delete { kind, id, time }
            }
            "STA" => {
                tokens.command = "STA";
                let (kind, id, time) = tokens.kind_id_time()?;
                let value = tokens.optional_number()?;
                Command::Start { kind, id, time, value }
            }
            "STO" => {
                tokens.command = "STO";
                let (kind, id, time) = tokens.kind_id_time()?;
                let size = tokens.optional_number()?;
                Command::Stop { kind, id, time, size }
            }
            "OCC" => {
                tokens.command = "OCC";
                let (kind, id, time) = tokens.kind_id_time()?;
                Command::Occurrence { kind, id, time }
            }
            "TIM" => {
                tokens.command = "TIM";
                let time = parse_number(tokens.required("time")?, line)?;
                Command::Time { time }
            }
            "VAL" => {
                tokens.command = "VAL";
                let kind = tokens.kind()?;
                let id = parse_integer(tokens.required("id")?, line)?;
                let value = parse_number(tokens.required("value")?, line)?;
                Command::Value { kind, id, value }
            }
            "DSC" => {
                tokens.command = "DSC";
                let ordinal = tokens.required("descrKind")?;
                let kind = parse_ordinal(ordinal)
                    .and_then(DescriptionKind::from_ordinal)
                    .ok_or_else(|| ParseError::UnknownDescriptionKind {
                        line,
                        ordinal: ordinal.to_string(),
                    })?;
                let id = parse_integer(tokens.required("id")?, line)?;
                let content = match kind {
                    DescriptionKind::String => {
                        DescriptionContent::Text(tokens.required_remainder("text")?.to_string())
                    }
                    DescriptionKind::Color => {
                        DescriptionContent::Color(tokens.required_remainder("text")?.to_string())
                    }
                    DescriptionKind::Number => {
                        DescriptionContent::Number(parse_number(tokens.required("number")?, line)?)
                    }
                    DescriptionKind::Cycles => {
                        DescriptionContent::Cycles(parse_number(tokens.required("number")?, line)?)
                    }
                };
                Command::Describe { id, content }
            }
            "NAM" => {
                tokens.command = "NAM";
                let kind = tokens.kind()?;
                let id = parse_integer(tokens.required("id")?, line)?;
                let name = tokens.required_remainder("name")?.to_string();
                Command::Name { kind, id, name }
            }
            "DNM" => {
                tokens.command = "DNM";
                tokens.required("kind")?;
                let id = parse_integer(tokens.required("id")?, line)?;
                let name = tokens.required_remainder("name")?.to_string();
                Command::DescriptionName { id, name }
            }
            "TIME" => {
                tokens.command = "TIME";
                let ticks_per_sec = parse_number(tokens.required("ticksPerSec")?, line)?;
                Command::TimeUnit { ticks_per_sec }
            }
            "SPEED" => {
                tokens.command = "SPEED";
                let clocks_per_sec = parse_number(tokens.required("clocksPerSec")?, line)?;
                Command::Speed { clocks_per_sec }
            }
            "MEMSPEED" => {
                tokens.command = "MEMSPEED";
                let clocks_per_sec = parse_number(tokens.required("memClocksPerSec")?, line)?;
                Command::MemSpeed { clocks_per_sec }
            }
            "END" => {
                tokens.command = "END";
                Command::End
            }
            _ => {
                return Err(ParseError::UnknownCommand {
                    line,
                    command: name.to_string(),
                })
            }
        };

        tokens.finish(strict)?;
        Ok(Some(command))
    }
}

/// Cursor over the whitespace-separated tokens of one line
struct Tokens<'a> {
    rest: &'a str,
    line: usize,
    command: &'static str,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            rest: text,
            line,
            command: "",
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Everything left on the line, trimmed
    fn remainder(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim();
        self.rest = "";
        (!rest.is_empty()).then_some(rest)
    }

    fn required(&mut self, argument: &'static str) -> Result<&'a str, ParseError> {
        self.next().ok_or(ParseError::MissingArgument {
            line: self.line,
            command: self.command,
            argument,
        })
    }

    fn required_remainder(&mut self, argument: &'static str) -> Result<&'a str, ParseError> {
        self.remainder().ok_or(ParseError::MissingArgument {
            line: self.line,
            command: self.command,
            argument,
        })
    }

    fn optional_number(&mut self) -> Result<Option<f64>, ParseError> {
        self.next().map(|t| parse_number(t, self.line)).transpose()
    }

    fn kind(&mut self) -> Result<LineKind, ParseError> {
        let token = self.required("typeOrdinal")?;
        parse_ordinal(token)
            .and_then(LineKind::from_ordinal)
            .ok_or_else(|| ParseError::UnknownEntityKind {
                line: self.line,
                ordinal: token.to_string(),
            })
    }

    fn kind_id_time(&mut self) -> Result<(LineKind, i64, f64), ParseError> {
        let kind = self.kind()?;
        let id = parse_integer(self.required("id")?, self.line)?;
        let time = parse_number(self.required("time")?, self.line)?;
        Ok((kind, id, time))
    }

    fn finish(mut self, strict: bool) -> Result<(), ParseError> {
        match self.remainder() {
            None => Ok(()),
            Some(extra) if strict => Err(ParseError::TrailingTokens {
                line: self.line,
                command: self.command,
                extra: extra.to_string(),
            }),
            Some(extra) => {
                debug!("line {}: ignoring trailing tokens '{}'", self.line, extra);
                Ok(())
            }
        }
    }
}

fn parse_ordinal(token: &str) -> Option<u32> {
    token.parse::<u32>().ok()
}

fn parse_owner(token: &str, line: usize) -> Result<u32, ParseError> {
    to_owner_id(parse_integer(token, line)?, token, line)
}

fn to_owner_id(id: i64, token: &str, line: usize) -> Result<u32, ParseError> {
    u32::try_from(id).map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Parse an integer id from hex (`0x` prefix) or decimal
pub fn parse_integer(token: &str, line: usize) -> Result<i64, ParseError> {
    let parsed = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok().map(|v| v as i64)
    } else {
        token.parse::<i64>().ok()
    };
    parsed.ok_or_else(|| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Parse a finite number from hex (`0x` prefix) or decimal
pub fn parse_number(token: &str, line: usize) -> Result<f64, ParseError> {
    let parsed = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok().map(|v| v as f64)
    } else {
        token.parse::<f64>().ok()
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            line,
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Option<Command>, ParseError> {
        Command::parse(1, text, true)
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_cpu_forms() {
        assert_eq!(
            parse("CPU 1 core one").unwrap(),
            Some(Command::Cpu { id: 1, name: "core one".to_string() })
        );
        assert_eq!(
            parse("CPU main").unwrap(),
            Some(Command::Cpu { id: 0, name: "main".to_string() })
        );
    }

    #[test]
    fn test_start_with_optional_value() {
        assert_eq!(
            parse("STA 0 5 100").unwrap(),
            Some(Command::Start { kind: LineKind::Task, id: 5, time: 100.0, value: None })
        );
        assert_eq!(
            parse("STA 3 0x10 1.5 7").unwrap(),
            Some(Command::Start { kind: LineKind::Queue, id: 16, time: 1.5, value: Some(7.0) })
        );
    }

    #[test]
    fn test_create_port_forms() {
        let Some(Command::Create { kind, port, .. }) = parse("CRE 11 1 0 2 3").unwrap() else {
            panic!("expected CRE");
        };
        assert_eq!(kind, LineKind::Port);
        assert_eq!(
            port,
            Some(PortSpec { producer: 2, producer_owner: None, consumer: 3, consumer_owner: None })
        );

        let Some(Command::Create { port, .. }) = parse("CRE 11 1 0 2 1 3 0").unwrap() else {
            panic!("expected CRE");
        };
        assert_eq!(port.and_then(|p| p.producer_owner), Some(1));

        assert!(matches!(
            parse("CRE 11 1 0 2 3 4"),
            Err(ParseError::InvalidPortForm { found: 3, .. })
        ));
    }

    #[test]
    fn test_describe_kinds() {
        assert_eq!(
            parse("DSC 3 4 dark red").unwrap(),
            Some(Command::Describe { id: 4, content: DescriptionContent::Color("dark red".to_string()) })
        );
        assert_eq!(
            parse("DSC 2 4 1000").unwrap(),
            Some(Command::Describe { id: 4, content: DescriptionContent::Cycles(1000.0) })
        );
        assert!(matches!(
            parse("DSC 9 4 1000"),
            Err(ParseError::UnknownDescriptionKind { .. })
        ));
    }

    #[test]
    fn test_errors_carry_line() {
        let err = Command::parse(42, "FOO 1 2", true).unwrap_err();
        assert_eq!(err.line(), Some(42));
        assert!(matches!(err, ParseError::UnknownCommand { .. }));

        assert!(matches!(
            parse("STA 12 1 0"),
            Err(ParseError::UnknownEntityKind { .. })
        ));
        assert!(matches!(
            parse("STA 0 1"),
            Err(ParseError::MissingArgument { argument: "time", .. })
        ));
        assert!(matches!(
            parse("STA 0 1 abc"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(matches!(
            parse("OCC 4 1 10 extra"),
            Err(ParseError::TrailingTokens { command: "OCC", .. })
        ));
        assert_eq!(
            Command::parse(1, "OCC 4 1 10 extra", false).unwrap(),
            Some(Command::Occurrence { kind: LineKind::Event, id: 1, time: 10.0 })
        );
    }

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("0x3e8", 1).unwrap(), 1000.0);
        assert_eq!(parse_number("2.5", 1).unwrap(), 2.5);
        assert!(parse_number("NaN", 1).is_err());
        assert_eq!(parse_integer("-3", 1).unwrap(), -3);
    }
}
