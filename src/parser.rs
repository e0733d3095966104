// parser.rs

/// Splits a command line into words. Single quotes are literal, double
/// quotes honour `\\`, `\"` and `\$`, and a backslash outside quotes escapes
/// the next character. An unterminated quote runs to the end of the line.
pub fn split_words(line: &str) -> Vec<String> {
    enum State { Normal, Single, Double }
    let mut words = Vec::new();
    let mut cur = String::new();
    // distinguishes `''` (an empty word) from no word at all
    let mut started = false;
    let mut state = State::Normal;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match state {
            State::Normal => match ch {
                '\'' => {
                    state = State::Single;
                    started = true;
                }
                '"' => {
                    state = State::Double;
                    started = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        cur.push(next);
                        started = true;
                    }
                }
                c if c.is_whitespace() => {
                    if started {
                        words.push(std::mem::take(&mut cur));
                        started = false;
                    }
                }
                _ => {
                    cur.push(ch);
                    started = true;
                }
            },
            State::Single => match ch {
                '\'' => state = State::Normal,
                _ => cur.push(ch),
            },
            State::Double => match ch {
                '"' => state = State::Normal,
                '\\' => match chars.peek() {
                    Some(&(next @ ('\\' | '"' | '$'))) => {
                        cur.push(next);
                        chars.next();
                    }
                    _ => cur.push('\\'),
                },
                _ => cur.push(ch),
            },
        }
    }
    if started {
        words.push(cur);
    }
    words
}

/// Quotes `word` so that [`split_words`] gives it back unchanged.
pub fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./=:,+%@".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
