//! Init command list interpreter
//!
//! Panel variants describe their power-up sequence as a static byte list. This
//! module walks such a list and drives each record through a [`CommandSink`].
//!
//! ## List Format
//!
//! ```text
//! list    := record* terminator
//! record  := L (1 byte) payload (L bytes)
//! term    := 0xFF
//! ```
//!
//! A payload is either a command or a delay:
//!
//! - **Command**: byte 0 is the opcode, the rest are its arguments. The record
//!   is sent as one chip-select framed write.
//! - **Delay**: byte 0 has [`CMD_INIT_DELAY`] (bit 7) set. Nothing is sent;
//!   the following byte is the wait in milliseconds. Longer payloads carry a
//!   little-endian duration in up to four bytes, and a lone marker byte uses
//!   its low 7 bits. Extended durations are specific to the panel variant
//!   that uses them.
//!
//! A zero length record is skipped. Opcodes with bit 7 set cannot be expressed
//! as command records.
//!
//! ## Example
//!
//! ```
//! use panel_device::command::{CommandList, CommandSink, Playback};
//!
//! struct Log {
//!     sent: usize,
//!     waited: u32,
//! }
//!
//! impl CommandSink for Log {
//!     type Error = core::convert::Infallible;
//!     fn send_command(&mut self, _opcode: u8, _args: &[u8]) -> Result<(), Self::Error> {
//!         self.sent += 1;
//!         Ok(())
//!     }
//!     fn delay_ms(&mut self, ms: u32) {
//!         self.waited += ms;
//!     }
//! }
//!
//! // Sleep out, wait 120ms, display on
//! const INIT: &[u8] = &[0x01, 0x11, 0x02, 0x80, 120, 0x01, 0x29, 0xFF];
//!
//! let mut log = Log { sent: 0, waited: 0 };
//! let outcome = CommandList::new(INIT).play(&mut log);
//! assert_eq!(outcome, Ok(Playback::Completed { records: 3 }));
//! assert_eq!(log.sent, 2);
//! assert_eq!(log.waited, 120);
//! ```

/// Delay marker bit in the first payload byte of a record
pub const CMD_INIT_DELAY: u8 = 0x80;

/// Length byte that ends a list
pub const LIST_TERMINATOR: u8 = 0xFF;

/// Record ceiling used when the caller does not choose one
///
/// Guards against lists that lost their terminator.
pub const DEFAULT_MAX_RECORDS: usize = 256;

/// Receiver for decoded records
///
/// The device implements this by framing each command with chip select.
pub trait CommandSink {
    /// Error type of the underlying transport
    type Error;

    /// Send one command with its arguments as a single framed write
    fn send_command(&mut self, opcode: u8, args: &[u8]) -> Result<(), Self::Error>;

    /// Block for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// One decoded record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record<'a> {
    /// Send `opcode` followed by `args`
    Command {
        /// Command byte
        opcode: u8,
        /// Argument bytes
        args: &'a [u8],
    },
    /// Wait before the next record
    Delay {
        /// Duration in milliseconds
        ms: u32,
    },
}

/// Where playback stands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No record read yet
    #[default]
    NotStarted,
    /// At least one step taken, more may follow
    Running,
    /// Terminator reached, ceiling hit, or bytes exhausted
    Done,
}

/// How a finished playback ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playback {
    /// The terminator was reached
    Completed {
        /// Records played, including empty ones
        records: usize,
    },
    /// Stopped before a terminator (record ceiling or end of bytes)
    ///
    /// A record cut short by the end of the bytes is dropped, not sent.
    Truncated {
        /// Records played before stopping
        records: usize,
    },
}

impl Playback {
    /// Whether the list ended at its terminator
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Cursor over a command list
#[derive(Clone, Debug)]
pub struct CommandList<'a> {
    bytes: &'a [u8],
    pos: usize,
    records: usize,
    max_records: usize,
    state: PlaybackState,
    terminated: bool,
}

impl<'a> CommandList<'a> {
    /// Cursor with the [`DEFAULT_MAX_RECORDS`] ceiling
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_max_records(bytes, DEFAULT_MAX_RECORDS)
    }

    /// Cursor that stops after `max_records` records
    pub fn with_max_records(bytes: &'a [u8], max_records: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            records: 0,
            max_records,
            state: PlaybackState::NotStarted,
            terminated: false,
        }
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Records consumed so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Outcome so far; `Truncated` until the terminator has been read
    pub fn outcome(&self) -> Playback {
        if self.terminated {
            Playback::Completed {
                records: self.records,
            }
        } else {
            Playback::Truncated {
                records: self.records,
            }
        }
    }

    /// Decode the next record
    ///
    /// Returns `None` once playback is [`PlaybackState::Done`].
    pub fn next_record(&mut self) -> Option<Record<'a>> {
        loop {
            match self.state {
                PlaybackState::Done => return None,
                PlaybackState::NotStarted => self.state = PlaybackState::Running,
                PlaybackState::Running => {}
            }

            let Some(&len) = self.bytes.get(self.pos) else {
                log::warn!("command list ended without terminator");
                return self.finish();
            };
            if len == LIST_TERMINATOR {
                self.pos += 1;
                self.terminated = true;
                return self.finish();
            }
            if self.records >= self.max_records {
                log::warn!("command list exceeded {} records", self.max_records);
                return self.finish();
            }

            let start = self.pos + 1;
            let Some(payload) = self.bytes.get(start..start + usize::from(len)) else {
                log::warn!("command list record at {} is cut short", self.pos);
                return self.finish();
            };
            self.pos = start + usize::from(len);
            self.records += 1;

            if let Some(record) = decode(payload) {
                log::trace!("command list record {:?}", record);
                return Some(record);
            }
        }
    }

    /// Drive every remaining record through `sink`
    ///
    /// # Errors
    ///
    /// Returns the sink's error; playback stops at the failing record.
    pub fn play<S: CommandSink>(&mut self, sink: &mut S) -> Result<Playback, S::Error> {
        while let Some(record) = self.next_record() {
            match record {
                Record::Command { opcode, args } => sink.send_command(opcode, args)?,
                Record::Delay { ms } => sink.delay_ms(ms),
            }
        }
        Ok(self.outcome())
    }

    fn finish(&mut self) -> Option<Record<'a>> {
        self.state = PlaybackState::Done;
        None
    }
}

impl<'a> Iterator for CommandList<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

fn decode(payload: &[u8]) -> Option<Record<'_>> {
    let (&first, rest) = payload.split_first()?;
    if first & CMD_INIT_DELAY == 0 {
        return Some(Record::Command {
            opcode: first,
            args: rest,
        });
    }
    let ms = match rest {
        [] => u32::from(first & !CMD_INIT_DELAY),
        [ms] => u32::from(*ms),
        extended => {
            let mut bytes = [0u8; 4];
            let len = extended.len().min(bytes.len());
            bytes[..len].copy_from_slice(&extended[..len]);
            u32::from_le_bytes(bytes)
        }
    };
    Some(Record::Delay { ms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent(Vec<u8>),
        Waited(u32),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        fail_on: Option<u8>,
    }

    impl Recorder {
        fn sent(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, Event::Sent(_)))
                .count()
        }
    }

    impl CommandSink for Recorder {
        type Error = u8;

        fn send_command(&mut self, opcode: u8, args: &[u8]) -> Result<(), Self::Error> {
            if self.fail_on == Some(opcode) {
                return Err(opcode);
            }
            let mut bytes = alloc::vec![opcode];
            bytes.extend_from_slice(args);
            self.events.push(Event::Sent(bytes));
            Ok(())
        }

        fn delay_ms(&mut self, ms: u32) {
            self.events.push(Event::Waited(ms));
        }
    }

    #[test]
    fn test_single_command_record() {
        let mut list = CommandList::new(&[0x02, 0x01, 0xAB, 0xFF]);
        let mut sink = Recorder::default();
        let outcome = list.play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Completed { records: 1 }));
        assert_eq!(sink.events, [Event::Sent(alloc::vec![0x01, 0xAB])]);
        assert_eq!(list.state(), PlaybackState::Done);
    }

    #[test]
    fn test_single_delay_record() {
        let mut list = CommandList::new(&[0x02, 0x80, 0x0A, 0xFF]);
        let mut sink = Recorder::default();
        let outcome = list.play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Completed { records: 1 }));
        assert_eq!(sink.sent(), 0);
        assert_eq!(sink.events, [Event::Waited(10)]);
        assert_eq!(list.state(), PlaybackState::Done);
    }

    #[test]
    fn test_state_progression() {
        let mut list = CommandList::new(&[0x01, 0x29, 0xFF]);
        assert_eq!(list.state(), PlaybackState::NotStarted);
        assert_eq!(
            list.next_record(),
            Some(Record::Command {
                opcode: 0x29,
                args: &[]
            })
        );
        assert_eq!(list.state(), PlaybackState::Running);
        assert_eq!(list.next_record(), None);
        assert_eq!(list.state(), PlaybackState::Done);
        assert_eq!(list.next_record(), None);
    }

    #[test]
    fn test_terminator_only() {
        let mut list = CommandList::new(&[0xFF]);
        assert_eq!(list.next_record(), None);
        assert_eq!(list.outcome(), Playback::Completed { records: 0 });
    }

    #[test]
    fn test_bytes_after_terminator_ignored() {
        let list = CommandList::new(&[0x01, 0x11, 0xFF, 0x01, 0x29]);
        assert_eq!(list.count(), 1);
    }

    #[test]
    fn test_mixed_sequence() {
        const LIST: &[u8] = &[
            0x01, 0x01, // software reset
            0x02, 0x80, 150, // wait
            0x01, 0x11, // sleep out
            0x02, 0x3A, 0x55, // 16-bit colour
            0x05, 0x2A, 0x00, 0x00, 0x00, 0xEF, // column range
            0xFF,
        ];
        let mut sink = Recorder::default();
        let outcome = CommandList::new(LIST).play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Completed { records: 5 }));
        assert_eq!(
            sink.events,
            [
                Event::Sent(alloc::vec![0x01]),
                Event::Waited(150),
                Event::Sent(alloc::vec![0x11]),
                Event::Sent(alloc::vec![0x3A, 0x55]),
                Event::Sent(alloc::vec![0x2A, 0x00, 0x00, 0x00, 0xEF]),
            ]
        );
    }

    #[test]
    fn test_delay_short_form_uses_marker_bits() {
        let records: Vec<_> = CommandList::new(&[0x01, 0x85, 0xFF]).collect();
        assert_eq!(records, [Record::Delay { ms: 5 }]);
    }

    #[test]
    fn test_delay_extended_little_endian() {
        let records: Vec<_> = CommandList::new(&[0x03, 0x80, 0xF4, 0x01, 0xFF]).collect();
        assert_eq!(records, [Record::Delay { ms: 500 }]);
    }

    #[test]
    fn test_empty_record_skipped() {
        let mut list = CommandList::new(&[0x00, 0x01, 0x29, 0xFF]);
        let mut sink = Recorder::default();
        let outcome = list.play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Completed { records: 2 }));
        assert_eq!(sink.events, [Event::Sent(alloc::vec![0x29])]);
    }

    #[test]
    fn test_missing_terminator_truncates() {
        let mut sink = Recorder::default();
        let outcome = CommandList::new(&[0x01, 0x11, 0x01, 0x29]).play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Truncated { records: 2 }));
        assert_eq!(sink.sent(), 2);
    }

    #[test]
    fn test_cut_short_record_not_sent() {
        let mut sink = Recorder::default();
        let outcome = CommandList::new(&[0x01, 0x11, 0x04, 0x2A, 0x00]).play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Truncated { records: 1 }));
        assert_eq!(sink.events, [Event::Sent(alloc::vec![0x11])]);
    }

    #[test]
    fn test_record_ceiling_stops_playback() {
        // Plenty of records, no terminator in sight
        let bytes = [0x01u8, 0x00].repeat(50);
        let mut list = CommandList::with_max_records(&bytes, 8);
        let mut sink = Recorder::default();
        let outcome = list.play(&mut sink);
        assert_eq!(outcome, Ok(Playback::Truncated { records: 8 }));
        assert_eq!(sink.sent(), 8);
        assert_eq!(list.state(), PlaybackState::Done);
    }

    #[test]
    fn test_ceiling_does_not_hide_terminator() {
        let mut list = CommandList::with_max_records(&[0x01, 0x11, 0xFF], 1);
        let mut sink = Recorder::default();
        assert_eq!(list.play(&mut sink), Ok(Playback::Completed { records: 1 }));
    }

    #[test]
    fn test_sink_error_stops_playback() {
        let mut sink = Recorder {
            fail_on: Some(0x11),
            ..Recorder::default()
        };
        let outcome = CommandList::new(&[0x01, 0x01, 0x01, 0x11, 0x01, 0x29, 0xFF]).play(&mut sink);
        assert_eq!(outcome, Err(0x11));
        assert_eq!(sink.events, [Event::Sent(alloc::vec![0x01])]);
    }
}
