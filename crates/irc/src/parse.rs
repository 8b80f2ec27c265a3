//! Minimal IRC line model: optional tags, optional prefix, command,
//! params with a trailing segment. Enough for the message types the
//! connector reacts to; everything else passes through as-is.

/// One parsed IRC line. Borrows from the raw input.
#[derive(Debug, PartialEq, Eq)]
pub struct IrcLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: Vec<&'a str>,
}

/// Parse a single IRC line. Returns `None` for empty or malformed input.
pub fn parse_line(line: &str) -> Option<IrcLine<'_>> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    if rest.is_empty() {
        return None;
    }

    // Message tags (`@key=value;... `) are not interpreted here.
    if let Some(stripped) = rest.strip_prefix('@') {
        let (_, after) = stripped.split_once(' ')?;
        rest = after;
    }

    let mut prefix = None;
    if let Some(stripped) = rest.strip_prefix(':') {
        let (pfx, after) = stripped.split_once(' ')?;
        prefix = Some(pfx);
        rest = after;
    }

    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };

    let mut parts = head.split_ascii_whitespace();
    let command = parts.next()?;
    let mut params: Vec<&str> = parts.collect();
    if let Some(trailing) = trailing {
        params.push(trailing);
    }

    Some(IrcLine {
        prefix,
        command,
        params,
    })
}

/// Extract the nick from a `nick!user@host` prefix.
pub fn nick_of(prefix: &str) -> &str {
    prefix
        .split(['!', '@'])
        .next()
        .unwrap_or(prefix)
}
