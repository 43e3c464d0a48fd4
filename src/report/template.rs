//! Record templates for the `-f` option.
//!
//! A template is literal text with `{field}` placeholders resolved against
//! the record's JSON object; nested fields use dots (`{Position.Line}`).
//! `{{` and `}}` escape literal braces. A placeholder naming a field the
//! record does not have renders as `<no value>`; an object field with the
//! shape of a position renders as `file:line:col`, other objects render as
//! compact JSON. The template is validated at parse time so a malformed
//! one is a usage error before any analysis runs.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Vec<String>),
}

/// A parsed record template.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template, rejecting unterminated or empty placeholders.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(format!("unterminated placeholder {{{field}"));
                    }
                    let field = field.trim();
                    if field.is_empty() {
                        return Err("empty placeholder {}".to_string());
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(
                        field.split('.').map(str::to_string).collect(),
                    ));
                }
                '}' => return Err("unmatched } in template".to_string()),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Render one record. A trailing newline is appended when missing.
    pub fn render(&self, record: &Value) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(path) => out.push_str(&lookup(record, path)),
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

fn lookup(record: &Value, path: &[String]) -> String {
    let mut cur = record;
    for key in path {
        match cur.get(key) {
            Some(next) => cur = next,
            None => return "<no value>".to_string(),
        }
    }
    render_value(cur)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "<no value>".to_string(),
        Value::Object(map) => {
            // Positions render in the conventional file:line:col form.
            let pos = |f: &str, l: &str, c: &str| {
                Some(format!(
                    "{}:{}:{}",
                    map.get(f)?.as_str()?,
                    map.get(l)?.as_u64()?,
                    map.get(c)?.as_u64()?
                ))
            };
            pos("File", "Line", "Col")
                .or_else(|| pos("file", "line", "col"))
                .unwrap_or_else(|| value.to_string())
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_substitution() {
        let t = Template::parse("{Name} at {Position.Line}").unwrap();
        let record = json!({"Name": "lib.G", "Position": {"File": "lib.src", "Line": 5, "Col": 1}});
        assert_eq!(t.render(&record), "lib.G at 5\n");
    }

    #[test]
    fn test_position_object_rendering() {
        let t = Template::parse("{Position}").unwrap();
        let record = json!({"Position": {"File": "lib.src", "Line": 5, "Col": 1}});
        assert_eq!(t.render(&record), "lib.src:5:1\n");
    }

    #[test]
    fn test_missing_field() {
        let t = Template::parse("{Nope}").unwrap();
        assert_eq!(t.render(&json!({})), "<no value>\n");
    }

    #[test]
    fn test_escaped_braces() {
        let t = Template::parse("{{literal}} {Name}").unwrap();
        assert_eq!(t.render(&json!({"Name": "x"})), "{literal} x\n");
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert!(Template::parse("{Name").is_err());
        assert!(Template::parse("{}").is_err());
        assert!(Template::parse("oops}").is_err());
    }

    #[test]
    fn test_trailing_newline_not_doubled() {
        let t = Template::parse("{Name}\n").unwrap();
        assert_eq!(t.render(&json!({"Name": "x"})), "x\n");
    }
}
