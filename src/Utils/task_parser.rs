/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" which has titles and
/// pairs key-vector of values into HashMap<String, HashMap<String, Vec<Value>>>.
/// Lines starting with //, #, % or ; are comments.
///
/// Example of an optimizer task:
/// ```text
/// optimizer
///   t0: 0.0 tf: 2.0 steps: 20 degree: 3
///   jacobian: SYM
/// logging
///   level: info
/// ```
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Vec<Value>>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// integers are accepted where a float is expected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self { Some(*i) } else { None }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self { Some(*b) } else { None }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// word characters without spaces; used for titles and keys
fn parse_word(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = parse_word(input)?;
    Ok((input.trim(), result))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_word, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parsed task document: section title -> key -> values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDocument {
    pub sections: HashMap<String, SectionMap>,
}

impl TaskDocument {
    pub fn parse(input: &str) -> Result<Self, String> {
        let filtered = filter_comments(input);
        if filtered.trim().is_empty() {
            return Ok(TaskDocument::default());
        }
        let mut parser = many1(delimited(space0, parse_section, multispace0));
        match parser.parse(filtered.as_str()) {
            Ok((remaining, sections)) => {
                if !remaining.trim().is_empty() {
                    return Err(format!(
                        "Failed to parse entire document. Remaining: '{}'",
                        remaining
                    ));
                }
                Ok(TaskDocument {
                    sections: sections.into_iter().collect(),
                })
            }
            Err(e) => Err(format!("Parsing error: {:?}", e)),
        }
    }

    pub fn values(&self, section: &str, key: &str) -> Option<&Vec<Value>> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    fn single(&self, section: &str, key: &str) -> Result<Option<&Value>, String> {
        match self.values(section, key) {
            None => Ok(None),
            Some(values) if values.len() == 1 => Ok(Some(&values[0])),
            Some(values) => Err(format!(
                "{}.{} expects one value, got {}",
                section,
                key,
                values.len()
            )),
        }
    }

    pub fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>, String> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_float()
                .map(Some)
                .ok_or_else(|| format!("{}.{} must be a number, got '{}'", section, key, v)),
        }
    }

    pub fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, String> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .map(Some)
                .ok_or_else(|| {
                    format!("{}.{} must be a non-negative integer, got '{}'", section, key, v)
                }),
        }
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, String> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_boolean()
                .map(Some)
                .ok_or_else(|| format!("{}.{} must be true or false, got '{}'", section, key, v)),
        }
    }

    /// any single value rendered as text
    pub fn get_string(&self, section: &str, key: &str) -> Result<Option<String>, String> {
        Ok(self.single(section, key)?.map(|v| v.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word_and_title() {
        let (remaining, title) = parse_title("optimizer\n t0: 0").unwrap();
        assert_eq!(title, "optimizer");
        assert_eq!(remaining, "t0: 0");
        let (remaining, key) = parse_word("trace_dir: ./out").unwrap();
        assert_eq!(key, "trace_dir");
        assert_eq!(remaining, ": ./out");
    }

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("12, x").unwrap().1, Value::Integer(12));
        assert_eq!(parse_value("-0.5").unwrap().1, Value::Float(-0.5));
        assert_eq!(parse_value("true").unwrap().1, Value::Boolean(true));
        assert_eq!(
            parse_value("NUMDENSE").unwrap().1,
            Value::String("NUMDENSE".to_string())
        );
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("tf : 2.5 , 3 steps: 4").unwrap();
        assert_eq!(key, "tf");
        assert_eq!(values, vec![Value::Float(2.5), Value::Integer(3)]);
        assert_eq!(remaining, "steps: 4");
    }

    #[test]
    fn test_parse_document_with_comments() {
        let doc = "// optimizer task\noptimizer\n  t0: 0.0 tf: 2.0\n  steps: 20\n# logging\nlogging\n  level: debug console: false\n";
        let doc = TaskDocument::parse(doc).unwrap();
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.get_f64("optimizer", "tf").unwrap(), Some(2.0));
        assert_eq!(doc.get_f64("optimizer", "t0").unwrap(), Some(0.0));
        assert_eq!(doc.get_usize("optimizer", "steps").unwrap(), Some(20));
        assert_eq!(doc.get_bool("logging", "console").unwrap(), Some(false));
        assert_eq!(
            doc.get_string("logging", "level").unwrap(),
            Some("debug".to_string())
        );
        assert_eq!(doc.get_f64("optimizer", "missing").unwrap(), None);
    }

    #[test]
    fn test_type_errors() {
        let doc = TaskDocument::parse("optimizer steps: -3 tf: abc trace: 1, 2").unwrap();
        assert!(doc.get_usize("optimizer", "steps").is_err());
        assert!(doc.get_f64("optimizer", "tf").is_err());
        assert!(doc.get_bool("optimizer", "trace").is_err());
    }

    #[test]
    fn test_empty_document() {
        let doc = TaskDocument::parse("// nothing here\n\n").unwrap();
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        assert!(TaskDocument::parse("optimizer").is_err());
    }
}
