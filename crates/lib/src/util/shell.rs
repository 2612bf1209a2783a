//! Quoting helpers for generated POSIX shell and PowerShell text.
//!
//! Single-quoted forms are fully literal. Double-quoted forms keep variable
//! expansion (`$HOME`, `$env:TEMP`) working while protecting spaces.

/// Quote `s` as a single POSIX shell word with no expansion.
///
/// Embedded single quotes become `'\''`.
pub fn single_quote(s: &str) -> String {
  format!("'{}'", s.replace('\'', r"'\''"))
}

/// Quote `s` for a POSIX double-quoted context.
///
/// Backslash, double quote and backtick are escaped; `$` is left alone so
/// variables still expand.
pub fn double_quote(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    if matches!(c, '\\' | '"' | '`') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('"');
  out
}

/// Quote `s` as a PowerShell verbatim string. Embedded single quotes are doubled.
pub fn ps_single_quote(s: &str) -> String {
  format!("'{}'", s.replace('\'', "''"))
}

/// Quote `s` as an expandable PowerShell string.
pub fn ps_double_quote(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    if matches!(c, '`' | '"') {
      out.push('`');
    }
    out.push(c);
  }
  out.push('"');
  out
}

/// Whether `name` is usable as an environment variable name in both shells.
pub fn is_valid_env_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `name` is a plain account name, safe to place unquoted after `sudo -u`.
///
/// Letters, digits, `_`, `-` and `.`, not starting with a digit, `-` or `.`,
/// with an optional trailing `$` for machine accounts.
pub fn is_valid_user_name(name: &str) -> bool {
  let body = name.strip_suffix('$').unwrap_or(name);
  let mut chars = body.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
