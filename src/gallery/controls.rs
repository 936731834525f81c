//! Typed input controls for the path searcher.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ControlError;

pub const PATH_QUERY: &str = "PathQuery";
pub const PATH_VARS: &str = "PathVars";

/// Lower bound for the integers of a tag map.
const TAG_MAP_MIN: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Integer { value: i64, min: i64, max: i64 },
    /// Free text whose `tags` are highlighted wherever they occur.
    TaggedText { value: String, tags: Vec<String> },
    /// Named non-negative integers; the tag list is the key set.
    IntegerTagMap(BTreeMap<String, i64>),
}

/// A new value submitted for a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Integer(i64),
    Text(String),
    /// Replace the tag set of an integer tag map, keeping surviving values.
    Tags(Vec<String>),
    /// Set one entry of an integer tag map.
    TagValue(String, i64),
}

impl Control {
    pub fn integer(value: i64, min: i64, max: i64) -> Self {
        Self::Integer { value, min, max }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer { .. } => "integer",
            Self::TaggedText { .. } => "text",
            Self::IntegerTagMap(_) => "integerTags",
        }
    }

    /// Apply `input`; on error the control keeps its previous value.
    pub fn apply(&mut self, name: &str, input: ControlValue) -> Result<(), ControlError> {
        match (self, input) {
            (Self::Integer { value, min, max }, ControlValue::Integer(v)) => {
                if v < *min || v > *max {
                    return Err(ControlError::OutOfRange { min: *min, max: *max });
                }
                *value = v;
            }
            (Self::TaggedText { value, .. }, ControlValue::Text(text)) => {
                *value = text;
            }
            (Self::IntegerTagMap(map), ControlValue::Tags(tags)) => {
                *map = retag(map, &tags);
            }
            (Self::IntegerTagMap(map), ControlValue::TagValue(tag, v)) => {
                if v < TAG_MAP_MIN {
                    return Err(ControlError::OutOfRange { min: TAG_MAP_MIN, max: i64::MAX });
                }
                map.insert(tag, v);
            }
            (control, _) => {
                return Err(ControlError::KindMismatch {
                    name: name.to_string(),
                    expected: control.kind(),
                });
            }
        }
        Ok(())
    }

    /// The control's value as JSON, as it is bound into remote calls.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer { value, .. } => Value::from(*value),
            Self::TaggedText { value, .. } => Value::from(value.clone()),
            Self::IntegerTagMap(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect::<Map<_, _>>())
            }
        }
    }

    pub fn display_value(&self) -> String {
        match self {
            Self::Integer { value, .. } => value.to_string(),
            Self::TaggedText { value, .. } => value.clone(),
            Self::IntegerTagMap(map) => map
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Parse `x=1 y=2` (spaces or commas). A bare name gets 0.
pub fn parse_tag_values(text: &str) -> Result<BTreeMap<String, i64>, String> {
    let mut vars = BTreeMap::new();
    for part in text.split(|c: char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty()) {
        let (name, value) = match part.split_once('=') {
            Some((n, v)) => {
                let v = v.trim().parse::<i64>().map_err(|_| format!("not an integer: {}", part))?;
                (n.trim(), v)
            }
            None => (part, 0),
        };
        if name.is_empty() {
            return Err(format!("missing variable name: {}", part));
        }
        vars.insert(name.to_string(), value);
    }
    Ok(vars)
}

/// New map with exactly `tags` as keys; known tags keep their value, new ones start at 0.
pub fn retag(map: &BTreeMap<String, i64>, tags: &[String]) -> BTreeMap<String, i64> {
    tags.iter()
        .map(|tag| (tag.clone(), map.get(tag).copied().unwrap_or(0)))
        .collect()
}

/// Split `text` into `(segment, highlighted)` runs, highlighting every
/// occurrence of any tag. Earlier and longer matches win.
pub fn highlight_segments<'a>(text: &'a str, tags: &[String]) -> Vec<(&'a str, bool)> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i < text.len() {
        let hit = tags
            .iter()
            .filter(|t| !t.is_empty() && text[i..].starts_with(t.as_str()))
            .map(|t| t.len())
            .max();
        match hit {
            Some(len) => {
                if plain_start < i {
                    segments.push((&text[plain_start..i], false));
                }
                segments.push((&text[i..i + len], true));
                i += len;
                plain_start = i;
            }
            None => {
                i += text[i..].chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }
    if plain_start < text.len() {
        segments.push((&text[plain_start..], false));
    }
    segments
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEntry {
    pub name: String,
    pub description: String,
    pub control: Control,
}

/// Ordered set of named controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlPanel {
    entries: Vec<ControlEntry>,
}

impl ControlPanel {
    /// The path searcher: a glob template and the integers substituted into it.
    pub fn path_searcher(query: &str, vars: BTreeMap<String, i64>) -> Self {
        let tags = vars.keys().cloned().collect();
        let mut panel = Self::default();
        panel.push(
            PATH_QUERY,
            "Enter a python f-string, using PathVars as variables",
            Control::TaggedText { value: query.to_string(), tags },
        );
        panel.push(
            PATH_VARS,
            "Set numerical values for the path replacements",
            Control::IntegerTagMap(vars),
        );
        panel
    }

    pub fn push(&mut self, name: &str, description: &str, control: Control) {
        self.entries.push(ControlEntry {
            name: name.to_string(),
            description: description.to_string(),
            control,
        });
    }

    pub fn entries(&self) -> &[ControlEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Control> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.control)
    }

    /// Apply `input` to the named control. A change to `PathVars` re-derives the
    /// highlight tags of `PathQuery`.
    pub fn set_value(&mut self, name: &str, input: ControlValue) -> Result<(), ControlError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ControlError::Unknown(name.to_string()))?;
        entry.control.apply(name, input)?;

        if name == PATH_VARS {
            let keys: Vec<String> = match self.get(PATH_VARS) {
                Some(Control::IntegerTagMap(map)) => map.keys().cloned().collect(),
                _ => Vec::new(),
            };
            if let Some(ControlEntry { control: Control::TaggedText { tags, .. }, .. }) =
                self.entries.iter_mut().find(|e| e.name == PATH_QUERY)
            {
                *tags = keys;
            }
        }
        Ok(())
    }

    pub fn path_query(&self) -> String {
        match self.get(PATH_QUERY) {
            Some(Control::TaggedText { value, .. }) => value.clone(),
            _ => String::new(),
        }
    }

    pub fn path_vars(&self) -> BTreeMap<String, i64> {
        match self.get(PATH_VARS) {
            Some(Control::IntegerTagMap(map)) => map.clone(),
            _ => BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_accept_pairs_and_bare_names() {
        let vars = parse_tag_values("x=3, y  z=-1").unwrap();
        assert_eq!(vars.get("x"), Some(&3));
        assert_eq!(vars.get("y"), Some(&0));
        assert_eq!(vars.get("z"), Some(&-1));
        assert!(parse_tag_values("x=abc").is_err());
        assert!(parse_tag_values("=4").is_err());
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn integer_control_enforces_bounds() {
        let mut c = Control::integer(123, -999, 999);
        assert_eq!(
            c.apply("A", ControlValue::Integer(1000)),
            Err(ControlError::OutOfRange { min: -999, max: 999 })
        );
        assert_eq!(c.display_value(), "123");
        c.apply("A", ControlValue::Integer(-999)).unwrap();
        assert_eq!(c.to_json(), serde_json::json!(-999));
    }

    #[test]
    fn mismatched_input_is_rejected() {
        let mut c = Control::TaggedText { value: "x".into(), tags: vec![] };
        let err = c.apply("Text", ControlValue::Integer(1)).unwrap_err();
        assert_eq!(err, ControlError::KindMismatch { name: "Text".into(), expected: "text" });
    }

    #[test]
    fn retag_keeps_surviving_values() {
        let map: BTreeMap<String, i64> = [("foo".to_string(), 10), ("bar".to_string(), 20)].into();
        let next = retag(&map, &tags(&["bar", "baz"]));
        assert_eq!(next.get("bar"), Some(&20));
        assert_eq!(next.get("baz"), Some(&0));
        assert!(!next.contains_key("foo"));
    }

    #[test]
    fn path_vars_drive_query_tags() {
        let mut panel = ControlPanel::path_searcher("/data/*{x}*", [("x".to_string(), 0)].into());
        panel.set_value(PATH_VARS, ControlValue::Tags(tags(&["x", "y"]))).unwrap();
        panel.set_value(PATH_VARS, ControlValue::TagValue("y".into(), 4)).unwrap();

        match panel.get(PATH_QUERY) {
            Some(Control::TaggedText { tags: t, .. }) => assert_eq!(t, &tags(&["x", "y"])),
            other => panic!("unexpected control {other:?}"),
        }
        assert_eq!(panel.path_vars().get("y"), Some(&4));
        assert!(panel.set_value(PATH_VARS, ControlValue::TagValue("y".into(), -1)).is_err());
        assert!(matches!(panel.set_value("Nope", ControlValue::Integer(1)), Err(ControlError::Unknown(_))));
    }

    #[test]
    fn highlight_marks_every_tag_occurrence() {
        let segs = highlight_segments("/img/{x}/{xy}.png", &tags(&["x", "xy"]));
        let highlighted: Vec<&str> = segs.iter().filter(|(_, h)| *h).map(|(s, _)| *s).collect();
        assert_eq!(highlighted, vec!["x", "xy"]);
        let joined: String = segs.iter().map(|(s, _)| *s).collect();
        assert_eq!(joined, "/img/{x}/{xy}.png");
    }
}
