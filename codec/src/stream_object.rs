//! Framing driver for stream objects.
//!
//! A stream object is a Start header, the object's own items, then (for
//! compound objects) framed children and an End header. The Start header's
//! length counts the items only.

use bitstream::{BitReader, BitWriter};
use tracing::trace;
use wire::{
    peek_header_kind, peek_start, Decode, Encode, HeaderKind, StreamObjectHeaderEnd,
    StreamObjectHeaderStart, StreamObjectType,
};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;

/// One framed object type.
pub trait StreamObject: Sized {
    /// Type code written in the object's headers.
    const OBJECT_TYPE: StreamObjectType;

    /// Writes the items counted by the Start header's length.
    fn encode_items(&self, writer: &mut BitWriter) -> CodecResult<()>;

    /// Writes framed children after the items. Only compound objects have any.
    fn encode_children(&self, _writer: &mut BitWriter) -> CodecResult<()> {
        Ok(())
    }

    /// Reads the items and children that follow `header`.
    ///
    /// The driver consumes both headers; compound implementations stop at
    /// their End header without reading it.
    fn decode_body(
        reader: &mut BitReader<'_>,
        header: &StreamObjectHeaderStart,
        ctx: &mut DecodeContext<'_>,
    ) -> CodecResult<Self>;
}

/// Decode-time state threaded through nested stream objects.
#[derive(Debug)]
pub struct DecodeContext<'a> {
    limits: &'a CodecLimits,
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    #[must_use]
    pub const fn new(limits: &'a CodecLimits) -> Self {
        Self { limits, depth: 0 }
    }

    #[must_use]
    pub const fn limits(&self) -> &'a CodecLimits {
        self.limits
    }

    /// Current nesting depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&mut self) -> CodecResult<()> {
        let depth = self.depth + 1;
        if depth > self.limits.max_nesting_depth {
            return Err(CodecError::NestingTooDeep {
                depth,
                limit: self.limits.max_nesting_depth,
            });
        }
        self.depth = depth;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fails if `count` exceeds `limit`.
    pub(crate) fn check_limit(kind: LimitKind, limit: usize, count: usize) -> CodecResult<()> {
        if count > limit {
            return Err(CodecError::LimitsExceeded {
                kind,
                limit,
                actual: count,
            });
        }
        Ok(())
    }
}

/// Writes `value` with its Start header and, for compound types, its End header.
pub fn encode_stream_object<T: StreamObject>(
    value: &T,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let mut items = BitWriter::new();
    value.encode_items(&mut items)?;
    let items = items.finish();

    let header = StreamObjectHeaderStart::new(T::OBJECT_TYPE, items.len() as u64);
    header.encode(writer)?;
    writer.write_bytes(&items)?;
    value.encode_children(writer)?;
    if T::OBJECT_TYPE.is_compound() {
        StreamObjectHeaderEnd::new(T::OBJECT_TYPE).encode(writer)?;
    }
    trace!(object = %T::OBJECT_TYPE, items = items.len(), "encoded stream object");
    Ok(())
}

/// Reads one framed `T`, checking its type, length and End header.
pub fn decode_stream_object<T: StreamObject>(
    reader: &mut BitReader<'_>,
    ctx: &mut DecodeContext<'_>,
) -> CodecResult<T> {
    let header = StreamObjectHeaderStart::decode(reader)?;
    if header.object_type() != T::OBJECT_TYPE {
        return Err(CodecError::UnexpectedObjectType {
            expected: T::OBJECT_TYPE,
            found: header.object_type(),
        });
    }

    ctx.enter()?;
    let start = reader.byte_position();
    let value = T::decode_body(reader, &header, ctx)?;
    if header.is_compound() {
        expect_end(reader, T::OBJECT_TYPE)?;
    } else {
        check_items_consumed(&header, start, reader)?;
    }
    ctx.leave();

    trace!(object = %T::OBJECT_TYPE, length = header.length(), "decoded stream object");
    Ok(value)
}

/// Fails with `LengthMismatch` unless exactly `header.length()` bytes were
/// read since byte position `start`.
pub(crate) fn check_items_consumed(
    header: &StreamObjectHeaderStart,
    start: usize,
    reader: &BitReader<'_>,
) -> CodecResult<()> {
    let actual = reader.byte_position() - start;
    if actual as u64 != header.length() {
        return Err(CodecError::LengthMismatch {
            object_type: header.object_type(),
            declared: header.length(),
            actual,
        });
    }
    Ok(())
}

fn expect_end(
    reader: &mut BitReader<'_>,
    expected: StreamObjectType,
) -> CodecResult<StreamObjectHeaderEnd> {
    let end = StreamObjectHeaderEnd::decode(reader)?;
    if end.object_type() != expected {
        return Err(CodecError::MismatchedEnd {
            expected,
            found: end.object_type(),
        });
    }
    Ok(end)
}

/// Returns the type of the next object, or `None` at an End header or the
/// end of input.
pub fn peek_object_type(reader: &BitReader<'_>) -> CodecResult<Option<StreamObjectType>> {
    if reader.is_empty() || peek_header_kind(reader)? == HeaderKind::End {
        return Ok(None);
    }
    Ok(Some(peek_start(reader)?.object_type()))
}

/// Returns `true` if the next object is a `T`.
pub fn next_is<T: StreamObject>(reader: &BitReader<'_>) -> CodecResult<bool> {
    Ok(peek_object_type(reader)? == Some(T::OBJECT_TYPE))
}

/// Decodes a `T` if one comes next.
pub fn decode_optional<T: StreamObject>(
    reader: &mut BitReader<'_>,
    ctx: &mut DecodeContext<'_>,
) -> CodecResult<Option<T>> {
    if next_is::<T>(reader)? {
        decode_stream_object(reader, ctx).map(Some)
    } else {
        Ok(None)
    }
}

/// Decodes consecutive `T` objects, up to `limit` of them.
pub fn decode_repeated<T: StreamObject>(
    reader: &mut BitReader<'_>,
    ctx: &mut DecodeContext<'_>,
    kind: LimitKind,
    limit: usize,
) -> CodecResult<Vec<T>> {
    let mut items = Vec::new();
    while next_is::<T>(reader)? {
        DecodeContext::check_limit(kind, limit, items.len() + 1)?;
        items.push(decode_stream_object(reader, ctx)?);
    }
    Ok(items)
}

/// A header met while walking framed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// A Start header at byte `offset`. Its items have already been skipped.
    Start {
        offset: usize,
        header: StreamObjectHeaderStart,
    },
    /// The End header closing the innermost open compound object.
    End { header: StreamObjectHeaderEnd },
}

/// Walks one framed object of any type without interpreting its items,
/// passing each header to `visit` in stream order.
///
/// Nesting depth counts the same way [`decode_stream_object`] counts it, and
/// every End header must close the type its Start opened. Returns the
/// object's Start header.
pub fn walk_stream_object<F: FnMut(FrameEvent)>(
    reader: &mut BitReader<'_>,
    ctx: &mut DecodeContext<'_>,
    visit: &mut F,
) -> CodecResult<StreamObjectHeaderStart> {
    let offset = reader.byte_position();
    let header = StreamObjectHeaderStart::decode(reader)?;
    ctx.enter()?;
    let length = usize::try_from(header.length()).map_err(|_| wire::WireError::TruncatedInput {
        needed: usize::MAX,
        available: reader.bits_remaining(),
    })?;
    reader.read_bytes(length)?;
    visit(FrameEvent::Start { offset, header });

    if header.is_compound() {
        while peek_header_kind(reader)? == HeaderKind::Start {
            walk_stream_object(reader, ctx, visit)?;
        }
        let end = expect_end(reader, header.object_type())?;
        visit(FrameEvent::End { header: end });
    }
    ctx.leave();
    Ok(header)
}

/// Skips one framed object of any type without interpreting it.
///
/// Returns its Start header.
pub fn skip_stream_object(
    reader: &mut BitReader<'_>,
    ctx: &mut DecodeContext<'_>,
) -> CodecResult<StreamObjectHeaderStart> {
    walk_stream_object(reader, ctx, &mut |_| {})
}
