//! Control-channel payload catalog.
//!
//! These are the fixed message schemas the protocol engine itself speaks:
//! topic announcements, time sync stamps, log records and parameter
//! request/response. User payloads stay opaque byte blobs; only these
//! control messages are serialized here.
//!
//! Wire encoding is little-endian throughout. Strings are a `u32` byte
//! length followed by UTF-8 bytes, variable arrays a `u32` element count
//! followed by the elements.

/// A payload that can be put on / taken off the wire.
pub trait WireMessage: Sized {
    /// Exact serialized size in bytes.
    fn encoded_len(&self) -> usize;

    /// Serialize into `buf`, returning the bytes written.
    /// `None` when `buf` is too small.
    fn encode(&self, buf: &mut [u8]) -> Option<usize>;

    /// Parse from `data`. `None` on malformed or truncated input.
    /// Trailing bytes beyond the message are ignored.
    fn decode(data: &[u8]) -> Option<Self>;
}

struct PayloadWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PayloadWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Option<()> {
        let end = self.pos.checked_add(bytes.len())?;
        if end > self.buf.len() {
            return None;
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Some(())
    }

    fn put_u8(&mut self, v: u8) -> Option<()> {
        self.put_bytes(&[v])
    }

    fn put_u16(&mut self, v: u16) -> Option<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    fn put_u32(&mut self, v: u32) -> Option<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    fn put_i32(&mut self, v: i32) -> Option<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    fn put_f32(&mut self, v: f32) -> Option<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    fn put_str(&mut self, s: &str) -> Option<()> {
        self.put_u32(s.len() as u32)?;
        self.put_bytes(s.as_bytes())
    }

    fn finish(self) -> usize {
        self.pos
    }
}

struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn get_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn get_u16(&mut self) -> Option<u16> {
        let b = self.take(2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    fn get_u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_i32(&mut self) -> Option<i32> {
        let b = self.take(4)?;
        Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_f32(&mut self) -> Option<f32> {
        let b = self.take(4)?;
        Some(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_str(&mut self) -> Option<String> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

/// Topic announcement sent during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    pub topic_id: u16,
    pub topic_name: String,
    pub message_type: String,
}

impl WireMessage for TopicInfo {
    fn encoded_len(&self) -> usize {
        2 + 4 + self.topic_name.len() + 4 + self.message_type.len()
    }

    fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = PayloadWriter::new(buf);
        w.put_u16(self.topic_id)?;
        w.put_str(&self.topic_name)?;
        w.put_str(&self.message_type)?;
        Some(w.finish())
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut r = PayloadReader::new(data);
        Some(TopicInfo {
            topic_id: r.get_u16()?,
            topic_name: r.get_str()?,
            message_type: r.get_str()?,
        })
    }
}

/// Wall-clock instant exchanged during time sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeStamp {
    pub sec: u32,
    pub nsec: u32,
}

impl TimeStamp {
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// This instant moved forward by `ms` milliseconds, normalized so that
    /// `nsec` stays below one second.
    pub fn add_millis(self, ms: u64) -> Self {
        let mut sec = self.sec as u64 + ms / 1_000;
        let mut nsec = self.nsec as u64 + (ms % 1_000) * 1_000_000;
        sec += nsec / 1_000_000_000;
        nsec %= 1_000_000_000;
        TimeStamp {
            sec: sec as u32,
            nsec: nsec as u32,
        }
    }
}

impl WireMessage for TimeStamp {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = PayloadWriter::new(buf);
        w.put_u32(self.sec)?;
        w.put_u32(self.nsec)?;
        Some(w.finish())
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut r = PayloadReader::new(data);
        Some(TimeStamp {
            sec: r.get_u32()?,
            nsec: r.get_u32()?,
        })
    }
}

/// Severity of a [`LogMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl LogLevel {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(LogLevel::Debug),
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Warn),
            3 => Some(LogLevel::Error),
            4 => Some(LogLevel::Fatal),
            _ => None,
        }
    }
}

/// Log record relayed to the peer's logging sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub msg: String,
}

impl WireMessage for LogMessage {
    fn encoded_len(&self) -> usize {
        1 + 4 + self.msg.len()
    }

    fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = PayloadWriter::new(buf);
        w.put_u8(self.level as u8)?;
        w.put_str(&self.msg)?;
        Some(w.finish())
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut r = PayloadReader::new(data);
        Some(LogMessage {
            level: LogLevel::from_u8(r.get_u8()?)?,
            msg: r.get_str()?,
        })
    }
}

/// Parameter lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParam {
    pub name: String,
}

impl WireMessage for RequestParam {
    fn encoded_len(&self) -> usize {
        4 + self.name.len()
    }

    fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = PayloadWriter::new(buf);
        w.put_str(&self.name)?;
        Some(w.finish())
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut r = PayloadReader::new(data);
        Some(RequestParam {
            name: r.get_str()?,
        })
    }
}

/// Parameter lookup answer: parallel arrays of ints, floats and strings.
///
/// The typed accessors return the array only when its length matches the
/// caller's expectation, mirroring how callers declare the shape of the
/// parameter they asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamResponse {
    ints: Vec<i32>,
    floats: Vec<f32>,
    strings: Vec<String>,
}

impl ParamResponse {
    pub fn new(ints: Vec<i32>, floats: Vec<f32>, strings: Vec<String>) -> Self {
        Self {
            ints,
            floats,
            strings,
        }
    }

    /// Integer values, iff exactly `expected` of them arrived.
    pub fn ints(&self, expected: usize) -> Option<&[i32]> {
        (self.ints.len() == expected).then_some(self.ints.as_slice())
    }

    /// Float values, iff exactly `expected` of them arrived.
    pub fn floats(&self, expected: usize) -> Option<&[f32]> {
        (self.floats.len() == expected).then_some(self.floats.as_slice())
    }

    /// String values, iff exactly `expected` of them arrived.
    pub fn strings(&self, expected: usize) -> Option<&[String]> {
        (self.strings.len() == expected).then_some(self.strings.as_slice())
    }
}

impl WireMessage for ParamResponse {
    fn encoded_len(&self) -> usize {
        12 + 4 * self.ints.len()
            + 4 * self.floats.len()
            + self.strings.iter().map(|s| 4 + s.len()).sum::<usize>()
    }

    fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let mut w = PayloadWriter::new(buf);
        w.put_u32(self.ints.len() as u32)?;
        for &v in &self.ints {
            w.put_i32(v)?;
        }
        w.put_u32(self.floats.len() as u32)?;
        for &v in &self.floats {
            w.put_f32(v)?;
        }
        w.put_u32(self.strings.len() as u32)?;
        for s in &self.strings {
            w.put_str(s)?;
        }
        Some(w.finish())
    }

    fn decode(data: &[u8]) -> Option<Self> {
        let mut r = PayloadReader::new(data);

        // Counts come off the wire; collect element-by-element so a bogus
        // count fails on the truncated read instead of reserving memory.
        let n_ints = r.get_u32()? as usize;
        let ints = (0..n_ints)
            .map(|_| r.get_i32())
            .collect::<Option<Vec<_>>>()?;

        let n_floats = r.get_u32()? as usize;
        let floats = (0..n_floats)
            .map(|_| r.get_f32())
            .collect::<Option<Vec<_>>>()?;

        let n_strings = r.get_u32()? as usize;
        let strings = (0..n_strings)
            .map(|_| r.get_str())
            .collect::<Option<Vec<_>>>()?;

        Some(ParamResponse {
            ints,
            floats,
            strings,
        })
    }
}
