use crate::FormatError;

/// One group-code/value pair and the 1-based line its code appeared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    code: i32,
    value: &'a str,
    line: usize,
}

/// Cursor over the tokenized pair stream with single-record lookahead.
///
/// A code-0 pair both terminates the record being read and starts the next one,
/// so record readers stop by `unread`-ing it for the caller that owns boundaries.
pub(crate) struct TokenCursor<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn tokenize(source: &'a str) -> Result<Self, FormatError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mut lines: Vec<&str> = source.lines().collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        if lines.len() % 2 != 0 {
            return Err(FormatError::Invalid {
                line: lines.len(),
                message: "group code without a value line".to_string(),
            });
        }

        let mut tokens = Vec::with_capacity(lines.len() / 2);
        for (index, pair) in lines.chunks_exact(2).enumerate() {
            let line = index * 2 + 1;
            let raw_code = pair[0].trim();
            let code = raw_code.parse::<i32>().map_err(|_| FormatError::Invalid {
                line,
                message: format!("group code {raw_code:?} is not an integer"),
            })?;
            tokens.push(Token {
                code,
                value: pair[1].trim_end_matches('\r'),
                line,
            });
        }
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn next_pair(&mut self) -> Option<(i32, &'a str)> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some((token.code, token.value))
    }

    pub(crate) fn peek(&self) -> Option<(i32, &'a str)> {
        self.tokens
            .get(self.position)
            .map(|token| (token.code, token.value))
    }

    /// Steps back over the pair most recently returned by `next_pair`.
    pub(crate) fn unread(&mut self) {
        debug_assert!(self.position > 0, "unread before any read");
        self.position = self.position.saturating_sub(1);
    }

    /// Next attribute of the current record. Stops (without consuming) at the next
    /// code-0 pair; running out of input mid-record is a truncation error.
    pub(crate) fn attribute(&mut self, record: &str) -> Result<Option<(i32, &'a str)>, FormatError> {
        match self.next_pair() {
            Some((0, _)) => {
                self.unread();
                Ok(None)
            }
            Some(pair) => Ok(Some(pair)),
            None => Err(FormatError::Truncated {
                context: record.to_string(),
            }),
        }
    }

    /// Consumes attributes up to the next record.
    pub(crate) fn skip_record(&mut self, record: &str) -> Result<(), FormatError> {
        while self.attribute(record)?.is_some() {}
        Ok(())
    }

    /// Line number of the pair most recently returned.
    pub(crate) fn line(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(0, |token| token.line)
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> FormatError {
        FormatError::Invalid {
            line: self.line(),
            message: message.into(),
        }
    }
}
