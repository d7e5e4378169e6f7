//! STOMP 1.2 frames as carried in WebSocket text messages.

use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    // CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" | "STOMP" => Ok(Command::Connect),
            "CONNECTED" => Ok(Command::Connected),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "MESSAGE" => Ok(Command::Message),
            "RECEIPT" => Ok(Command::Receipt),
            "ERROR" => Ok(Command::Error),
            "DISCONNECT" => Ok(Command::Disconnect),
            other => Err(DecodeError::Frame(format!("unknown command {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// First occurrence wins, as STOMP requires for repeated headers.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn connect(host: &str) -> Self {
        Frame::new(Command::Connect)
            .header("accept-version", "1.1,1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect(receipt: &str) -> Self {
        Frame::new(Command::Disconnect).header("receipt", receipt)
    }

    /// Error text from an ERROR frame: the `message` header, else the body.
    pub fn error_message(&self) -> String {
        match self.get("message") {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => self.body.trim().to_string(),
        }
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame. `Ok(None)` for a heart-beat (only end-of-line bytes).
    pub fn parse(raw: &str) -> Result<Option<Frame>, DecodeError> {
        let text = raw.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (head, rest) = text
            .split_once("\n\n")
            .or_else(|| text.split_once("\r\n\r\n"))
            .ok_or_else(|| DecodeError::Frame("missing blank line after headers".into()))?;

        let mut lines = head.lines().map(|l| l.trim_end_matches('\r'));
        let command: Command = lines
            .next()
            .ok_or_else(|| DecodeError::Frame("missing command".into()))?
            .parse()?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| DecodeError::Frame(format!("malformed header line {line:?}")))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Frame {
            command,
            headers,
            body: String::new(),
        };
        let body = match frame.get("content-length") {
            Some(len) => {
                let len: usize = len
                    .trim()
                    .parse()
                    .map_err(|_| DecodeError::Frame(format!("bad content-length {len:?}")))?;
                rest.get(..len)
                    .ok_or_else(|| DecodeError::Frame("body shorter than content-length".into()))?
            }
            None => rest
                .split_once('\0')
                .map(|(body, _)| body)
                .ok_or_else(|| DecodeError::Frame("missing NUL terminator".into()))?,
        };

        Ok(Some(Frame {
            body: body.to_string(),
            ..frame
        }))
    }
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(DecodeError::Frame(format!(
                    "invalid header escape \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_connect_verbatim() {
        let encoded = Frame::connect("tasks.local:8080").encode();
        assert_eq!(
            encoded,
            "CONNECT\naccept-version:1.1,1.2\nhost:tasks.local:8080\nheart-beat:0,0\n\n\0"
        );
    }

    #[test]
    fn parses_spring_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/tasks\ncontent-type:application/json\nsubscription:sub-0\nmessage-id:abc-1\ncontent-length:13\n\n{\"taskId\":1}\n\0";
        let frame = Frame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.get("destination"), Some("/topic/tasks"));
        assert_eq!(frame.body, "{\"taskId\":1}\n");
    }

    #[test]
    fn body_without_content_length_ends_at_nul() {
        let frame = Frame::parse("RECEIPT\nreceipt-id:bye\n\n\0\n").unwrap().unwrap();
        assert_eq!(frame.command, Command::Receipt);
        assert_eq!(frame.get("receipt-id"), Some("bye"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn heart_beats_are_not_frames() {
        assert_eq!(Frame::parse("\n").unwrap(), None);
        assert_eq!(Frame::parse("\r\n\n").unwrap(), None);
    }

    #[test]
    fn header_escapes_survive_a_round_trip() {
        let frame = Frame::new(Command::Message)
            .header("note", "a:b\\c\nd")
            .header("destination", "/topic/tasks");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\\\c\\nd\n"));
        assert_eq!(Frame::parse(&encoded).unwrap().unwrap(), frame);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(Frame::parse("BOGUS\n\n\0").is_err());
        assert!(Frame::parse("SEND\ndestination:/topic/tasks\n\n\0").is_err());
        assert!(Frame::parse("MESSAGE\nno-colon\n\n\0").is_err());
        assert!(Frame::parse("MESSAGE\ncontent-length:40\n\nshort\0").is_err());
        assert!(Frame::parse("MESSAGE\nx:\\t\n\n\0").is_err());
    }

    #[test]
    fn error_message_prefers_header() {
        let frame = Frame::parse("ERROR\nmessage:bad destination\n\ndetails\0").unwrap().unwrap();
        assert_eq!(frame.error_message(), "bad destination");
        let bare = Frame::parse("ERROR\n\nbroker down\n\0").unwrap().unwrap();
        assert_eq!(bare.error_message(), "broker down");
    }
}
