//! Accumulator for one in-progress escape sequence.
//!
//! Bytes are appended while the interpreter is inside an escape; once the
//! sequence is complete the handlers walk it with a parse cursor and pull out
//! typed values. Extraction never mutates the collected bytes (only
//! [`EscapeAccumulator::remove_last`] does), and the cursor never exceeds the length.
//!
//! Number encodings:
//! - ASCII decimal with an optional leading sign and `' '`, `','`, `';'` separators,
//! - packed binary where every byte lies in `0x20..=0x3F` and carries five bits
//!   (`byte & 0x1F`), most significant group first: one byte (5 bits),
//!   a word (10 bits), or a triple (15 bits).

/// Lowest byte accepted by the packed binary encodings (`' '`).
pub const BINARY_MIN: u8 = 0x20;
/// Highest byte accepted by the packed binary encodings (`'?'`).
pub const BINARY_MAX: u8 = 0x3F;

/// Collected bytes of one escape sequence plus a parse cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeAccumulator {
    bytes: Vec<u8>,
    idx: usize,
}

impl EscapeAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an accumulator pre-filled with `bytes`, cursor at 0.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            idx: 0,
        }
    }

    /// Start a fresh sequence.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.idx = 0;
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current parse cursor.
    #[must_use]
    pub fn index(&self) -> usize {
        self.idx
    }

    /// Move the cursor to `idx` if it addresses a collected byte.
    pub fn set_index(&mut self, idx: usize) {
        if idx < self.bytes.len() {
            self.idx = idx;
        }
    }

    /// Advance the cursor by `n` unless that would pass the end.
    pub fn advance(&mut self, n: usize) {
        if self.idx + n <= self.bytes.len() {
            self.idx += n;
        }
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.idx < self.bytes.len()
    }

    /// Byte at absolute position `pos`, or 0 past the end.
    #[must_use]
    pub fn byte_at(&self, pos: usize) -> u8 {
        self.bytes.get(pos).copied().unwrap_or(0)
    }

    /// Most recently appended byte.
    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// Drop the most recently appended byte. Used when an embedded `ESC`
    /// has to stand in for the terminator of the sequence it interrupted.
    pub fn remove_last(&mut self) {
        self.bytes.pop();
        self.idx = self.idx.min(self.bytes.len());
    }

    /// Consume one byte; 0 at the end.
    pub fn next_char(&mut self) -> u8 {
        match self.bytes.get(self.idx) {
            Some(&b) => {
                self.idx += 1;
                b
            }
            None => 0,
        }
    }

    /// Look at the byte under the cursor; 0 at the end.
    #[must_use]
    pub fn peek_char(&self) -> u8 {
        self.byte_at(self.idx)
    }

    // ── ASCII decimal ───────────────────────────────────────────────

    /// Parse a signed decimal at the cursor.
    ///
    /// Leading spaces are skipped and a sign is accepted only before the
    /// first digit. A space after the digits, a comma, or a semicolon ends the
    /// number and is consumed; any other byte ends it and is left in place.
    /// Without a digit the result is `None` and the cursor does not move.
    /// Values beyond the `i32` range saturate.
    pub fn parse_signed_int(&mut self) -> Option<i32> {
        let start = self.idx;
        let mut pos = self.idx;
        while self.bytes.get(pos) == Some(&b' ') {
            pos += 1;
        }

        let mut negative = false;
        match self.bytes.get(pos) {
            Some(b'-') => {
                negative = true;
                pos += 1;
            }
            Some(b'+') => pos += 1,
            _ => {}
        }

        let mut value: i64 = 0;
        let mut digits = 0usize;
        while let Some(&b) = self.bytes.get(pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
            digits += 1;
            pos += 1;
        }

        if digits == 0 {
            self.idx = start;
            return None;
        }

        if matches!(self.bytes.get(pos), Some(b' ' | b',' | b';')) {
            pos += 1;
        }
        self.idx = pos;

        let signed = if negative { -value } else { value };
        Some(signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// [`parse_signed_int`](Self::parse_signed_int) with `default` substituted for `None`.
    pub fn parse_signed_int_or(&mut self, default: i32) -> i32 {
        self.parse_signed_int().unwrap_or(default)
    }

    // ── Packed binary ───────────────────────────────────────────────

    /// One byte, 5 significant bits.
    pub fn parse_binary_byte(&mut self) -> Option<u32> {
        self.parse_binary_groups(1)
    }

    /// Two bytes, 10 significant bits.
    pub fn parse_binary_word(&mut self) -> Option<u32> {
        self.parse_binary_groups(2)
    }

    /// Three bytes, 15 significant bits.
    pub fn parse_binary_triple(&mut self) -> Option<u32> {
        self.parse_binary_groups(3)
    }

    fn parse_binary_groups(&mut self, groups: usize) -> Option<u32> {
        let chunk = self.bytes.get(self.idx..self.idx + groups)?;
        if !chunk.iter().all(|b| (BINARY_MIN..=BINARY_MAX).contains(b)) {
            return None;
        }
        let value = chunk
            .iter()
            .fold(0u32, |acc, &b| (acc << 5) | u32::from(b & 0x1F));
        self.idx += groups;
        Some(value)
    }
}
