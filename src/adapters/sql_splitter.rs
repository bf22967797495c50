// SQL文分割ユーティリティ
//
// スクリプトを実行可能な文の単位に分割します。
// 文字列リテラル、引用符付き識別子、コメント内の `;` は区切りとして扱いません。
// 方言ごとの字句（PostgreSQLのドル引用、MySQLのバックスラッシュエスケープ・`#` コメント・
// バッククォート識別子）も考慮します。単独行の `GO` もバッチ区切りとして扱います。

use crate::core::config::Dialect;

/// 字句の状態
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
    Dollar(String),
}

/// SQLスクリプトを文に分割する
///
/// 空の文（空白やコメントのみ）は返しません。
pub fn split_sql_statements(sql: &str, dialect: Dialect) -> Vec<String> {
    let mut statements = Vec::new();
    for batch in split_batches(sql) {
        split_batch(&batch, dialect, &mut statements);
    }
    statements
}

/// 単独行の `GO` でバッチに分割
fn split_batches(sql: &str) -> Vec<String> {
    let mut batches = vec![String::new()];
    for line in sql.lines() {
        if line.trim().eq_ignore_ascii_case("go") {
            batches.push(String::new());
            continue;
        }
        if let Some(current) = batches.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    batches
}

fn split_batch(sql: &str, dialect: Dialect, statements: &mut Vec<String>) {
    let mysql = dialect == Dialect::MySQL;
    let chars: Vec<char> = sql.chars().collect();
    let mut state = State::Normal;
    let mut current = String::new();
    let mut has_content = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &state {
            State::Normal => match (c, next) {
                ('-', Some('-')) => {
                    state = State::LineComment;
                    current.push_str("--");
                    i += 2;
                    continue;
                }
                ('#', _) if mysql => {
                    state = State::LineComment;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    current.push_str("/*");
                    i += 2;
                    continue;
                }
                ('\'', _) => {
                    state = State::SingleQuote;
                    has_content = true;
                }
                ('"', _) => {
                    state = State::DoubleQuote;
                    has_content = true;
                }
                ('`', _) if mysql => {
                    state = State::Backtick;
                    has_content = true;
                }
                ('$', _) if dialect == Dialect::PostgreSQL => {
                    if let Some(tag) = dollar_tag_at(&chars, i) {
                        current.push_str(&tag);
                        i += tag.chars().count();
                        state = State::Dollar(tag);
                        has_content = true;
                        continue;
                    }
                    has_content = true;
                }
                (';', _) => {
                    push_statement(&mut current, has_content, statements);
                    has_content = false;
                    i += 1;
                    continue;
                }
                _ => {
                    if !c.is_whitespace() {
                        has_content = true;
                    }
                }
            },
            State::SingleQuote | State::DoubleQuote if mysql && c == '\\' => {
                current.push(c);
                if let Some(escaped) = next {
                    current.push(escaped);
                }
                i += 2;
                continue;
            }
            State::SingleQuote => {
                if c == '\'' {
                    if next == Some('\'') {
                        current.push_str("''");
                        i += 2;
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                if c == '"' {
                    if next == Some('"') {
                        current.push_str("\"\"");
                        i += 2;
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::Backtick => {
                if c == '`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    current.push_str("*/");
                    state = State::Normal;
                    i += 2;
                    continue;
                }
            }
            State::Dollar(tag) => {
                if c == '$' && starts_with_at(&chars, i, tag) {
                    let len = tag.chars().count();
                    current.push_str(tag);
                    state = State::Normal;
                    i += len;
                    continue;
                }
            }
        }

        current.push(c);
        i += 1;
    }

    push_statement(&mut current, has_content, statements);
}

fn push_statement(current: &mut String, has_content: bool, statements: &mut Vec<String>) {
    let trimmed = current.trim();
    if has_content && !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// `$tag$` 形式のドル引用開始タグを取得
fn dollar_tag_at(chars: &[char], start: usize) -> Option<String> {
    let mut end = start + 1;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if end < chars.len() && chars[end] == '$' {
        Some(chars[start..=end].iter().collect())
    } else {
        None
    }
}

fn starts_with_at(chars: &[char], start: usize, tag: &str) -> bool {
    let tag_chars: Vec<char> = tag.chars().collect();
    chars.len() >= start + tag_chars.len() && chars[start..start + tag_chars.len()] == tag_chars[..]
}
