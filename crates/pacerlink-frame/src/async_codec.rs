use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_to, FrameFormat, Message};
use crate::error::FrameError;
use crate::kind::Direction;
use crate::parser::{ParserStats, StreamParser};

/// Tokio codec for one end of the link.
///
/// Decodes frames travelling towards this end and encodes frames travelling
/// away from it. Line noise is absorbed by the parser, never surfaced.
#[derive(Debug)]
pub struct LinkCodec {
    outgoing: Direction,
    format: FrameFormat,
    parser: StreamParser,
    pending: VecDeque<Message>,
}

impl LinkCodec {
    /// Codec for the end that sends frames in `outgoing` direction.
    pub fn new(outgoing: Direction, format: FrameFormat) -> Self {
        Self {
            outgoing,
            format,
            parser: StreamParser::new(outgoing.reverse(), format),
            pending: VecDeque::new(),
        }
    }

    /// Codec for the host end.
    pub fn host(format: FrameFormat) -> Self {
        Self::new(Direction::HostToMcu, format)
    }

    /// Codec for the microcontroller end.
    pub fn mcu(format: FrameFormat) -> Self {
        Self::new(Direction::McuToHost, format)
    }

    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }
}

impl Decoder for LinkCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let chunk = src.split();
        let pending = &mut self.pending;
        self.parser
            .feed(&chunk, &mut |message| pending.push_back(message));
        Ok(self.pending.pop_front())
    }
}

impl Encoder<Message> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_to(self.outgoing, &item, self.format, dst)?;
        Ok(())
    }
}
