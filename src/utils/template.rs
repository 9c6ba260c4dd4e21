//! Archive name templates
//!
//! Patterns use `{name}` placeholders: `{yyyy}` `{mm}` `{dd}` `{HH}` `{MM}` `{SS}`
//! `{US}` and `{tags}`. `{{` and `}}` produce literal braces.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder `{{{placeholder}}}` in name pattern `{pattern}`")]
    UnknownPlaceholder { pattern: String, placeholder: String },

    #[error("Unbalanced brace at position {position} in name pattern `{pattern}`")]
    Unbalanced { pattern: String, position: usize },
}

/// Source of the current time for name rendering
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Values available to a name pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams {
    pub year: i32,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
    pub microsecond: u32,
    pub tags: String,
}

impl TemplateParams {
    pub fn at(now: DateTime<Local>, tags: &str) -> Self {
        Self {
            year: now.year(),
            month: format!("{:02}", now.month()),
            day: format!("{:02}", now.day()),
            hour: format!("{:02}", now.hour()),
            minute: format!("{:02}", now.minute()),
            second: format!("{:02}", now.second()),
            microsecond: now.nanosecond() / 1_000 % 1_000_000,
            tags: tags.to_string(),
        }
    }

    fn lookup(&self, placeholder: &str) -> Option<String> {
        let value = match placeholder {
            "yyyy" => self.year.to_string(),
            "mm" => self.month.clone(),
            "dd" => self.day.clone(),
            "HH" => self.hour.clone(),
            "MM" => self.minute.clone(),
            "SS" => self.second.clone(),
            "US" => self.microsecond.to_string(),
            "tags" => self.tags.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// Substitute every placeholder of `pattern`
pub fn render(pattern: &str, params: &TemplateParams) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(c);
                }
                if !closed {
                    return Err(TemplateError::Unbalanced {
                        pattern: pattern.to_string(),
                        position,
                    });
                }
                let value = params.lookup(&placeholder).ok_or_else(|| {
                    TemplateError::UnknownPlaceholder {
                        pattern: pattern.to_string(),
                        placeholder,
                    }
                })?;
                out.push_str(&value);
            }
            '}' => {
                return Err(TemplateError::Unbalanced {
                    pattern: pattern.to_string(),
                    position,
                });
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// A name pattern bound to its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    pattern: String,
    tags: String,
}

impl NameTemplate {
    pub fn new(pattern: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            tags: tags.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render at the given instant
    pub fn render_at(&self, now: DateTime<Local>) -> Result<String, TemplateError> {
        render(&self.pattern, &TemplateParams::at(now, &self.tags))
    }

    /// Render with the clock's current time; each call reads the clock once
    pub fn render_now(&self, clock: &dyn Clock) -> Result<String, TemplateError> {
        self.render_at(clock.now())
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
