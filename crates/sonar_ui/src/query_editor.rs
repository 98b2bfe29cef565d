//! Logs Insights query editor support.
//!
//! Static language tables drive highlighting and completion; the formatter
//! puts every pipeline stage on its own line. None of this validates the
//! query; the service is the only judge of syntax.

/// Text the editor starts with.
pub const DEFAULT_QUERY: &str = "fields @timestamp, @message\n| filter @message = 'error'\n| limit 20";

/// Pipeline commands.
pub const COMMANDS: &[&str] =
    &["fields", "display", "filter", "parse", "sort", "limit", "stats", "dedup", "pattern"];

/// Keywords.
pub const KEYWORDS: &[&str] = &["and", "as", "asc", "by", "desc", "group", "in", "like", "not", "or"];

/// Built-in functions.
pub const FUNCTIONS: &[&str] = &[
    "abs",
    "avg",
    "bin",
    "ceil",
    "coalesce",
    "concat",
    "count",
    "count_distinct",
    "datefloor",
    "dateceil",
    "earliest",
    "floor",
    "fromMillis",
    "greatest",
    "isEmpty",
    "isPresent",
    "isBlank",
    "isValidIp",
    "isValidIpV4",
    "isValidIpV6",
    "isIpInSubnet",
    "isIpv4InSubnet",
    "isIpv6InSubnet",
    "latest",
    "least",
    "log",
    "ltrim",
    "max",
    "median",
    "min",
    "mod",
    "pct",
    "pow",
    "replace",
    "rtrim",
    "sortsFirst",
    "sortsLast",
    "strcontains",
    "strlen",
    "sqrt",
    "stddev",
    "substr",
    "sum",
    "toMillis",
    "toLower",
    "toUpper",
    "trim",
    "unmask",
];

/// Fields every log event carries.
pub const SYSTEM_FIELDS: &[&str] = &["@timestamp", "@message", "@log", "@logStream"];

/// Multi-character and pipe operators.
pub const OPERATORS: &[&str] = &["=", "!=", "<=", ">=", "|"];

/// Snippet offered for the `parse` command.
pub const PARSE_SNIPPET: &str = "parse ${1:@message} \"${2:pattern}\" as ${3:alias1}";

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '!', '%', '&', '+', '-', '*', '/', '|', '~', '^'];

/// Highlighting class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    Whitespace,
    Regexp,
    /// A known `@` field.
    SystemField,
    Number,
    String,
    Delimiter,
    Bracket,
    /// A command or keyword.
    Keyword,
    Function,
    Operator,
    Identifier,
    Invalid,
}

/// A token and its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

/// Split query text into highlighting tokens. Matching is case-insensitive.
///
/// Every byte of the input belongs to exactly one token.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let (kind, len) = next_token(rest);
        tokens.push(Token { kind, text: &rest[..len], start: pos });
        pos += len;
    }

    tokens
}

fn next_token(rest: &str) -> (TokenKind, usize) {
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return (TokenKind::Invalid, 0);
    };

    if first == '#' {
        return (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()));
    }

    if first.is_whitespace() {
        return (TokenKind::Whitespace, prefix_len(rest, char::is_whitespace));
    }

    if first == '/' {
        if let Some(len) = regexp_len(rest) {
            return (TokenKind::Regexp, len);
        }
    }

    if first == '@' {
        let len = 1 + prefix_len(&rest[1..], is_word_char);
        if len > 1 {
            let kind = if contains_ignore_case(SYSTEM_FIELDS, &rest[..len]) {
                TokenKind::SystemField
            } else {
                TokenKind::Identifier
            };
            return (kind, len);
        }
    }

    if let Some(len) = number_len(rest) {
        return (TokenKind::Number, len);
    }

    if first == '\'' || first == '"' {
        if let Some(close) = rest[1..].find(first) {
            return (TokenKind::String, close + 2);
        }
    }

    if first == ',' {
        return (TokenKind::Delimiter, 1);
    }

    if first == '(' || first == ')' {
        return (TokenKind::Bracket, 1);
    }

    if is_word_char(first) || matches!(first, '@' | '#' | '$') {
        let len = prefix_len(rest, |c| is_word_char(c) || matches!(c, '@' | '#' | '$'));
        let word = &rest[..len];
        let kind = if contains_ignore_case(COMMANDS, word) || contains_ignore_case(KEYWORDS, word) {
            TokenKind::Keyword
        } else if contains_ignore_case(FUNCTIONS, word) {
            TokenKind::Function
        } else {
            TokenKind::Identifier
        };
        return (kind, len);
    }

    if OPERATOR_CHARS.contains(&first) {
        return (TokenKind::Operator, 1);
    }

    (TokenKind::Invalid, first.len_utf8())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn prefix_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices().find(|(_, c)| !pred(*c)).map(|(i, _)| i).unwrap_or(s.len())
}

fn contains_ignore_case(table: &[&str], word: &str) -> bool {
    table.iter().any(|t| t.eq_ignore_ascii_case(word))
}

/// `/body/flags` where the body is non-empty and may contain escapes.
fn regexp_len(rest: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '\n' => return None,
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '/' if i == 1 => return None,
            '/' => {
                let flags = prefix_len(&rest[i + 1..], |c| c == 'g' || c == 'i');
                return Some(i + 1 + flags);
            }
            _ => {}
        }
    }
    None
}

/// `-?\d+(\.\d+)?`
fn number_len(rest: &str) -> Option<usize> {
    let sign = usize::from(rest.starts_with('-'));
    let digits = prefix_len(&rest[sign..], |c| c.is_ascii_digit());
    if digits == 0 {
        return None;
    }
    let mut len = sign + digits;
    if rest[len..].starts_with('.') {
        let fraction = prefix_len(&rest[len + 1..], |c| c.is_ascii_digit());
        if fraction > 0 {
            len += 1 + fraction;
        }
    }
    Some(len)
}

/// Kind of a completion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Keyword,
    Function,
    Field,
    Snippet,
}

/// One completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: &'static str,
    pub detail: String,
    pub kind: CompletionKind,
    pub insert_text: &'static str,
}

/// Characters that open the completion list.
pub const COMPLETION_TRIGGERS: &[char] = &[',', ' '];

/// Completion suggestions whose label starts with `prefix` (case-insensitive).
///
/// An empty prefix returns every suggestion.
pub fn completions(prefix: &str) -> Vec<CompletionItem> {
    let prefix = prefix.to_lowercase();

    let tables: [(&[&str], &str, CompletionKind); 4] = [
        (COMMANDS, "command", CompletionKind::Keyword),
        (KEYWORDS, "keyword", CompletionKind::Keyword),
        (FUNCTIONS, "function", CompletionKind::Function),
        (SYSTEM_FIELDS, "system field", CompletionKind::Field),
    ];

    let mut items: Vec<CompletionItem> = tables
        .iter()
        .flat_map(|(words, detail, kind)| {
            words.iter().map(move |w| CompletionItem {
                label: w,
                detail: format!("{detail} {w}"),
                kind: *kind,
                insert_text: w,
            })
        })
        .collect();

    items.push(CompletionItem {
        label: "parse",
        detail: "command snippet parse".to_string(),
        kind: CompletionKind::Snippet,
        insert_text: PARSE_SNIPPET,
    });

    items.retain(|item| item.label.to_lowercase().starts_with(&prefix));
    items
}

/// Put every pipeline stage on its own line.
///
/// Each stage is trimmed, literal `\n` sequences are removed and `\"` is
/// unescaped.
pub fn format_query(query: &str) -> String {
    query
        .split('|')
        .map(|stage| stage.trim().replace("\\n", "").replace("\\\"", "\""))
        .collect::<Vec<_>>()
        .join("\n| ")
}
