//! `Range` header parsing (RFC 7233 byte ranges).

/// One inclusive byte span over a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: u64,
    pub end: u64,
}

impl ByteSpan {
    /// Number of payload bytes served for this span.
    ///
    /// A span whose start equals its end is served as an empty payload;
    /// delta-sync clients use such spans as probes and expect a declared
    /// `Content-Length` of zero.
    pub fn payload_len(&self) -> u64 {
        if self.start == self.end {
            0
        } else {
            self.end - self.start + 1
        }
    }
}

/// Result of parsing a `Range` header against a resource of known size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Header syntax was not a valid byte-range set.
    Malformed,
    /// Syntactically valid, but at least one span falls outside `[0, size)`.
    Unsatisfiable,
    /// The header carried no range specs at all.
    Empty,
    /// All spans are satisfiable, in request order.
    Satisfiable(Vec<ByteSpan>),
}

/// Parse a `Range` header value against a resource of `size` bytes.
///
/// Every span must satisfy `0 <= start <= end < size`; a spec pointing past
/// the end of the resource makes the whole set unsatisfiable rather than
/// being clamped. Suffix specs (`-n`) address the final `n` bytes.
pub fn parse_range_header(size: u64, header: &str) -> RangeOutcome {
    let Some(spec_list) = header.trim().strip_prefix("bytes=") else {
        return RangeOutcome::Malformed;
    };

    let mut spans = Vec::new();
    let mut saw_unsatisfiable = false;
    for spec in spec_list.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        match parse_spec(size, spec) {
            Some(SpecOutcome::Span(span)) => spans.push(span),
            Some(SpecOutcome::OutOfBounds) => saw_unsatisfiable = true,
            None => return RangeOutcome::Malformed,
        }
    }

    if saw_unsatisfiable {
        RangeOutcome::Unsatisfiable
    } else if spans.is_empty() {
        RangeOutcome::Empty
    } else {
        RangeOutcome::Satisfiable(spans)
    }
}

enum SpecOutcome {
    Span(ByteSpan),
    OutOfBounds,
}

fn parse_spec(size: u64, spec: &str) -> Option<SpecOutcome> {
    let (first, last) = spec.split_once('-')?;
    let first = first.trim();
    let last = last.trim();

    if first.is_empty() {
        // Suffix spec: the final `n` bytes.
        let n: u64 = last.parse().ok()?;
        if n == 0 || size == 0 {
            return Some(SpecOutcome::OutOfBounds);
        }
        let start = size.saturating_sub(n);
        return Some(SpecOutcome::Span(ByteSpan {
            start,
            end: size - 1,
        }));
    }

    let start: u64 = first.parse().ok()?;
    let end: u64 = if last.is_empty() {
        if size == 0 {
            return Some(SpecOutcome::OutOfBounds);
        }
        size - 1
    } else {
        last.parse().ok()?
    };

    if start > end || end >= size {
        return Some(SpecOutcome::OutOfBounds);
    }
    Some(SpecOutcome::Span(ByteSpan { start, end }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_range_parses() {
        assert_eq!(
            parse_range_header(1000, "bytes=0-99"),
            RangeOutcome::Satisfiable(vec![ByteSpan { start: 0, end: 99 }])
        );
    }

    #[test]
    fn multiple_ranges_keep_request_order() {
        assert_eq!(
            parse_range_header(1000, "bytes=200-299, 0-99"),
            RangeOutcome::Satisfiable(vec![
                ByteSpan {
                    start: 200,
                    end: 299
                },
                ByteSpan { start: 0, end: 99 },
            ])
        );
    }

    #[test]
    fn open_ended_range_runs_to_final_byte() {
        assert_eq!(
            parse_range_header(100, "bytes=90-"),
            RangeOutcome::Satisfiable(vec![ByteSpan { start: 90, end: 99 }])
        );
    }

    #[test]
    fn suffix_range_addresses_final_bytes() {
        assert_eq!(
            parse_range_header(100, "bytes=-10"),
            RangeOutcome::Satisfiable(vec![ByteSpan { start: 90, end: 99 }])
        );
        // A suffix longer than the resource covers the whole resource.
        assert_eq!(
            parse_range_header(100, "bytes=-500"),
            RangeOutcome::Satisfiable(vec![ByteSpan { start: 0, end: 99 }])
        );
    }

    #[test]
    fn missing_unit_prefix_is_malformed() {
        assert_eq!(parse_range_header(100, "0-99"), RangeOutcome::Malformed);
        assert_eq!(
            parse_range_header(100, "items=0-99"),
            RangeOutcome::Malformed
        );
    }

    #[test]
    fn non_numeric_bounds_are_malformed() {
        assert_eq!(
            parse_range_header(100, "bytes=a-b"),
            RangeOutcome::Malformed
        );
        assert_eq!(
            parse_range_header(100, "bytes=0-99,banana"),
            RangeOutcome::Malformed
        );
    }

    #[test]
    fn empty_spec_list_yields_empty() {
        assert_eq!(parse_range_header(100, "bytes="), RangeOutcome::Empty);
        assert_eq!(parse_range_header(100, "bytes=,,"), RangeOutcome::Empty);
    }

    #[test]
    fn spans_past_the_end_are_unsatisfiable() {
        assert_eq!(
            parse_range_header(100, "bytes=100-"),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(100, "bytes=0-100"),
            RangeOutcome::Unsatisfiable
        );
        // One bad span poisons the whole set.
        assert_eq!(
            parse_range_header(100, "bytes=0-9,500-600"),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn inverted_span_is_unsatisfiable() {
        assert_eq!(
            parse_range_header(100, "bytes=50-10"),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn zero_length_span_has_empty_payload() {
        let span = ByteSpan { start: 10, end: 10 };
        assert_eq!(span.payload_len(), 0);
        let span = ByteSpan { start: 10, end: 19 };
        assert_eq!(span.payload_len(), 10);
    }

    #[test]
    fn zero_suffix_is_unsatisfiable() {
        assert_eq!(
            parse_range_header(100, "bytes=-0"),
            RangeOutcome::Unsatisfiable
        );
    }
}
