//! Cursor-based traversal of flat token streams.
//!
//! A container's extent is read from its begin token's `component_token_count`,
//! so skipping a field, group or composite is O(1) and sub-trees are addressed
//! as index spans into the caller's slice rather than copied token lists.

use crate::error::IrError;
use crate::token::{Signal, Token};

/// Half-open index range `[start, end)` into a token slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The tokens strictly between a container's begin and end markers.
    pub fn inner(&self) -> Span {
        Span::new(self.start + 1, self.end.saturating_sub(1).max(self.start + 1))
    }

    pub fn tokens<'a>(&self, tokens: &'a [Token]) -> &'a [Token] {
        &tokens[self.start..self.end]
    }
}

/// The span of the container (or leaf) beginning at `index`.
pub fn span_at(tokens: &[Token], index: usize) -> Result<Span, IrError> {
    let token = tokens
        .get(index)
        .ok_or_else(|| IrError::malformed(index, "expected a token, found end of stream"))?;

    let count = token.component_token_count;
    if count == 0 {
        return Err(IrError::malformed(
            index,
            format!("\"{}\" has a component token count of 0", token.name),
        ));
    }

    let end = index + count;
    if end > tokens.len() {
        return Err(IrError::malformed(
            index,
            format!(
                "\"{}\" spans {} tokens but only {} remain",
                token.name,
                count,
                tokens.len() - index
            ),
        ));
    }

    if let Some(expected) = token.signal.end_signal() {
        let last = &tokens[end - 1];
        if count < 2 || last.signal != expected {
            return Err(IrError::malformed(
                end - 1,
                format!("\"{}\" is not closed by {:?}", token.name, expected),
            ));
        }
    }

    Ok(Span::new(index, end))
}

/// Appends the span of every consecutive token starting at `index` whose signal
/// is `signal`, skipping each by its component token count. Returns the index
/// of the first token that does not match.
pub fn collect(
    signal: Signal,
    tokens: &[Token],
    index: usize,
    collected: &mut Vec<Span>,
) -> Result<usize, IrError> {
    let mut i = index;
    while let Some(token) = tokens.get(i) {
        if token.signal != signal {
            break;
        }
        let span = span_at(tokens, i)?;
        collected.push(span);
        i = span.end;
    }
    Ok(i)
}

pub fn collect_fields(tokens: &[Token], index: usize, fields: &mut Vec<Span>) -> Result<usize, IrError> {
    collect(Signal::BeginField, tokens, index, fields)
}

pub fn collect_groups(tokens: &[Token], index: usize, groups: &mut Vec<Span>) -> Result<usize, IrError> {
    collect(Signal::BeginGroup, tokens, index, groups)
}

pub fn collect_var_data(tokens: &[Token], index: usize, var_data: &mut Vec<Span>) -> Result<usize, IrError> {
    collect(Signal::BeginVarData, tokens, index, var_data)
}

/// The three regions of a message or group body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySpans {
    pub fields: Vec<Span>,
    pub groups: Vec<Span>,
    pub var_data: Vec<Span>,
}

/// Splits `body` (the tokens between a message's or group's markers) into its
/// field, group and var-data spans. Anything left over means the regions are
/// out of order or a stray token is present.
pub fn split_body(tokens: &[Token], body: Span) -> Result<BodySpans, IrError> {
    // Spans may not escape the body.
    let bounded = &tokens[..body.end];
    let mut spans = BodySpans::default();

    let i = collect_fields(bounded, body.start, &mut spans.fields)?;
    let i = collect_groups(bounded, i, &mut spans.groups)?;
    let i = collect_var_data(bounded, i, &mut spans.var_data)?;

    if i != body.end {
        let token = &tokens[i];
        return Err(IrError::malformed(
            i,
            format!(
                "unexpected {:?} \"{}\" after the {} region",
                token.signal,
                token.name,
                region_before(&spans)
            ),
        ));
    }

    Ok(spans)
}

fn region_before(spans: &BodySpans) -> &'static str {
    if !spans.var_data.is_empty() {
        "var-data"
    } else if !spans.groups.is_empty() {
        "group"
    } else {
        "field"
    }
}

/// Member spans of a composite, enum or set body.
pub fn members(tokens: &[Token], body: Span) -> Result<Vec<Span>, IrError> {
    let bounded = &tokens[..body.end];
    let mut spans = Vec::new();
    let mut i = body.start;
    while i < body.end {
        let span = span_at(bounded, i)?;
        spans.push(span);
        i = span.end;
    }
    Ok(spans)
}

/// Checks that every begin marker is closed by its matching end marker and that
/// every component token count agrees with the actual distance.
pub fn verify_spans(tokens: &[Token]) -> Result<(), IrError> {
    let mut open: Vec<usize> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.signal.is_begin() {
            open.push(i);
        } else if let Some(begin) = token.signal.begin_signal() {
            let start = open
                .pop()
                .ok_or_else(|| IrError::malformed(i, format!("unmatched {:?}", token.signal)))?;
            let opener = &tokens[start];
            if opener.signal != begin {
                return Err(IrError::malformed(
                    i,
                    format!("{:?} closes {:?} \"{}\"", token.signal, opener.signal, opener.name),
                ));
            }
            if opener.component_token_count != i - start + 1 {
                return Err(IrError::malformed(
                    start,
                    format!(
                        "\"{}\" declares {} component tokens but spans {}",
                        opener.name,
                        opener.component_token_count,
                        i - start + 1
                    ),
                ));
            }
        } else if token.component_token_count != 1 {
            return Err(IrError::malformed(
                i,
                format!("leaf \"{}\" has a component token count of {}", token.name, token.component_token_count),
            ));
        }
    }

    match open.last() {
        Some(&start) => Err(IrError::malformed(
            start,
            format!("\"{}\" is never closed", tokens[start].name),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(signal: Signal, name: &str, count: usize) -> Token {
        let mut token = Token::new(signal, name);
        token.component_token_count = count;
        token
    }

    fn field(name: &str) -> Vec<Token> {
        vec![
            token(Signal::BeginField, name, 3),
            token(Signal::Encoding, "uint32", 1),
            token(Signal::EndField, name, 3),
        ]
    }

    fn group(name: &str, body: Vec<Token>) -> Vec<Token> {
        let count = body.len() + 6;
        let mut tokens = vec![
            token(Signal::BeginGroup, name, count),
            token(Signal::BeginComposite, "groupSizeEncoding", 4),
            token(Signal::Encoding, "blockLength", 1),
            token(Signal::Encoding, "numInGroup", 1),
            token(Signal::EndComposite, "groupSizeEncoding", 4),
        ];
        tokens.extend(body);
        tokens.push(token(Signal::EndGroup, name, count));
        tokens
    }

    fn var_data(name: &str) -> Vec<Token> {
        vec![
            token(Signal::BeginVarData, name, 6),
            token(Signal::BeginComposite, "varDataEncoding", 4),
            token(Signal::Encoding, "length", 1),
            token(Signal::Encoding, "varData", 1),
            token(Signal::EndComposite, "varDataEncoding", 4),
            token(Signal::EndVarData, name, 6),
        ]
    }

    #[test]
    fn collect_stops_at_first_other_signal() {
        let mut tokens = field("a");
        tokens.extend(field("b"));
        tokens.extend(group("g", field("c")));

        let mut fields = Vec::new();
        let next = collect_fields(&tokens, 0, &mut fields).unwrap();
        assert_eq!(fields, vec![Span::new(0, 3), Span::new(3, 6)]);
        assert_eq!(next, 6);

        let mut groups = Vec::new();
        let next = collect_groups(&tokens, next, &mut groups).unwrap();
        assert_eq!(groups, vec![Span::new(6, 15)]);
        assert_eq!(next, tokens.len());
    }

    #[test]
    fn split_body_regions() {
        let mut tokens = field("a");
        tokens.extend(group("g", field("c")));
        tokens.extend(var_data("v"));
        let body = Span::new(0, tokens.len());

        let spans = split_body(&tokens, body).unwrap();
        assert_eq!(spans.fields.len(), 1);
        assert_eq!(spans.groups.len(), 1);
        assert_eq!(spans.var_data, vec![Span::new(12, 18)]);
        verify_spans(&tokens).unwrap();
    }

    #[test]
    fn field_after_group_is_malformed() {
        let mut tokens = group("g", vec![]);
        tokens.extend(field("late"));
        let body = Span::new(0, tokens.len());

        match split_body(&tokens, body) {
            Err(IrError::Malformed { index, .. }) => assert_eq!(index, 6),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn var_data_before_group_is_malformed() {
        let mut tokens = var_data("v");
        tokens.extend(group("g", vec![]));
        let body = Span::new(0, tokens.len());
        assert!(matches!(split_body(&tokens, body), Err(IrError::Malformed { .. })));
    }

    #[test]
    fn span_overrunning_body() {
        let mut tokens = field("a");
        tokens[0].component_token_count = 7;
        assert!(matches!(
            split_body(&tokens, Span::new(0, 3)),
            Err(IrError::Malformed { index: 0, .. })
        ));

        tokens[0].component_token_count = 0;
        assert!(matches!(span_at(&tokens, 0), Err(IrError::Malformed { index: 0, .. })));
    }

    #[test]
    fn verify_detects_bad_counts() {
        let mut tokens = group("g", field("x"));
        tokens[0].component_token_count = 8;
        assert!(verify_spans(&tokens).is_err());

        let mut tokens = field("x");
        tokens.pop();
        assert!(verify_spans(&tokens).is_err());
    }

    #[test]
    fn composite_members() {
        let tokens = vec![
            token(Signal::BeginComposite, "c", 4),
            token(Signal::Encoding, "a", 1),
            token(Signal::Encoding, "b", 1),
            token(Signal::EndComposite, "c", 4),
        ];
        let span = span_at(&tokens, 0).unwrap();
        assert_eq!(members(&tokens, span.inner()).unwrap(), vec![Span::new(1, 2), Span::new(2, 3)]);
    }
}
