//! Lookup scopes over the report data tree.

use serde_json::Value;

use crate::error::TemplateError;

/// One level of the scope chain. Blocks push a child scope for the value
/// they iterate, so inner keys shadow outer ones.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    name: &'a str,
    value: &'a Value,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            name: "root",
            value,
            parent: None,
        }
    }

    pub fn child<'b>(&'b self, name: &'b str, value: &'b Value) -> Scope<'b> {
        Scope {
            name,
            value,
            parent: Some(self),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Resolve a dotted path. The first segment is searched from the
    /// innermost scope outwards, the rest descend into the value found.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;

        let mut scope = Some(self);
        let mut found = None;
        while let Some(current) = scope {
            if let Some(value) = current.value.get(first) {
                found = Some(value);
                break;
            }
            scope = current.parent;
        }

        segments.try_fold(found?, |value, segment| match value {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => value.get(segment),
        })
    }

    /// Like [`lookup`](Self::lookup), but a missing key is an error naming
    /// the current block and the keys it offers.
    pub fn require(&self, path: &str) -> Result<&'a Value, TemplateError> {
        self.lookup(path).ok_or_else(|| TemplateError::MissingKey {
            key: path.to_string(),
            context: self.name.to_string(),
            available: self.available_keys(),
        })
    }

    /// Keys visible from the scopes that belong to the current block.
    fn available_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            if current.name != self.name {
                break;
            }
            if let Value::Object(map) = current.value {
                keys.extend(map.keys().cloned());
            }
            scope = current.parent;
        }
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Truthiness used by guards and `[[?if|...]]`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text substituted for `{{var}}`.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.len().to_string(),
    }
}

/// Value of `{{#collection}}`.
pub fn count(value: Option<&Value>) -> usize {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        Some(other) => usize::from(is_truthy(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_walks_outwards() {
        let root = json!({"title": "report", "schemata": [{"name": "dbo"}]});
        let scope = Scope::root(&root);
        let item = &root["schemata"][0];
        let inner = scope.child("schemata", item);

        assert_eq!(inner.lookup("name"), Some(&json!("dbo")));
        assert_eq!(inner.lookup("title"), Some(&json!("report")));
        assert_eq!(scope.lookup("schemata.0.name"), Some(&json!("dbo")));
        assert!(inner.lookup("missing").is_none());
    }

    #[test]
    fn test_require_reports_context_and_keys() {
        let root = json!({"title": "report"});
        let item = json!({"name": "dbo", "tables": 3});
        let scope = Scope::root(&root);
        let inner = scope.child("schemata", &item);

        let err = inner.require("count").unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingKey {
                key: "count".into(),
                context: "schemata".into(),
                available: vec!["name".into(), "tables".into()],
            }
        );
    }

    #[test]
    fn test_truthiness_and_display() {
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!([])));
        assert_eq!(display(&json!(3)), "3");
        assert_eq!(display(&json!(null)), "");
        assert_eq!(count(Some(&json!([1, 2]))), 2);
        assert_eq!(count(None), 0);
    }
}
