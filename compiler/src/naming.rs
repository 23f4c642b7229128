/// Type names. Underscored and all-caps names (`NULL_VAL`, `message_header`)
/// are recased word by word; camelCase schema names only get their first
/// letter raised.
pub fn to_pascal_case(s: &str) -> String {
    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(&word.to_lowercase()))
            .collect()
    } else if s == s.to_uppercase() {
        capitalize(&s.to_lowercase())
    } else {
        capitalize(s)
    }
}

/// PascalCase with a lowercase first letter: `fuel_figures` and
/// `FuelFigures` both become `fuelFigures`.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Member and module names for Rust and Python. Runs of capitals stay one
/// word: `sessionID` is `session_id`, `FIXVersion` is `fix_version`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                // A word starts after a lowercase letter, or at the last
                // capital of a run that is followed by lowercase.
                let boundary =
                    !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase());
                if boundary && prev != '_' {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// `maxRpm` becomes `MAX_RPM`.
pub fn to_upper_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// A JSON string literal, which is also a valid string literal in every
/// target language.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
