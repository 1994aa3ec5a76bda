//! Comment-aware scanning of a single SQL statement submitted by a client.
//!
//! The pipeline never parses SQL into an AST; it only needs to know the
//! leading keyword, after stripping comments and string literals, so it can
//! reject statements that try to manage transaction boundaries themselves.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Normal,
    LineComment,
    BlockComment,
    SingleQuote,
    DoubleQuote,
}

const FORBIDDEN_VERBS: [&str; 3] = ["BEGIN", "COMMIT", "ROLLBACK"];

/// True iff the statement's leading keyword (after stripping comments and
/// string literals) is `BEGIN`, `COMMIT`, or `ROLLBACK`. These are reserved
/// to the transaction pipeline itself.
pub fn starts_with_forbidden_verb(sql: &str) -> bool {
    let stripped = strip_comments(sql);
    match first_keyword(stripped.trim()) {
        Some(keyword) => FORBIDDEN_VERBS.contains(&keyword.as_str()),
        None => false,
    }
}

fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut result = String::with_capacity(sql.len());
    let mut index = 0;
    let mut state = ScanState::Normal;

    while index < chars.len() {
        let current = chars[index];
        let next = chars.get(index + 1).copied();

        match state {
            ScanState::Normal => {
                if current == '-' && next == Some('-') {
                    state = ScanState::LineComment;
                    index += 2;
                    continue;
                }

                if current == '/' && next == Some('*') {
                    state = ScanState::BlockComment;
                    index += 2;
                    continue;
                }

                if current == '\'' {
                    state = ScanState::SingleQuote;
                } else if current == '"' {
                    state = ScanState::DoubleQuote;
                }

                result.push(current);
                index += 1;
            }

            ScanState::LineComment => {
                if current == '\n' {
                    result.push('\n');
                    state = ScanState::Normal;
                }
                index += 1;
            }

            ScanState::BlockComment => {
                if current == '*' && next == Some('/') {
                    state = ScanState::Normal;
                    index += 2;
                } else {
                    index += 1;
                }
            }

            ScanState::SingleQuote => {
                result.push(current);

                if current == '\'' {
                    if next == Some('\'') {
                        result.push('\'');
                        index += 2;
                        continue;
                    }
                    state = ScanState::Normal;
                }

                index += 1;
            }

            ScanState::DoubleQuote => {
                result.push(current);

                if current == '"' {
                    if next == Some('"') {
                        result.push('"');
                        index += 2;
                        continue;
                    }
                    state = ScanState::Normal;
                }

                index += 1;
            }
        }
    }

    result
}

fn first_keyword(sql: &str) -> Option<String> {
    sql.split_whitespace()
        .map(|part| part.trim_start_matches(|c: char| !c.is_ascii_alphabetic()))
        .find(|part| !part.is_empty())
        .map(|part| {
            part.chars()
                .take_while(|ch| ch.is_ascii_alphabetic())
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .filter(|word| !word.is_empty())
}
