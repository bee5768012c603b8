use crate::grammar::Rule;
use std::collections::HashMap;
use std::fmt;

/// What a parser produces. The evaluator needs a way to lift lexemes, a
/// neutral value for rules without an action and lists for `::array`.
pub trait Semantic: fmt::Debug + Sized {
    fn from_lexeme(text: &str) -> Self;
    fn undefined() -> Self;
    fn from_list(values: Vec<Self>) -> Self;
}

/// Ready made semantic value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Undef,
    Text(String),
    Int(i64),
    Float(f64),
    List(Vec<Value>),
}

impl Semantic for Value {
    fn from_lexeme(text: &str) -> Self {
        Value::Text(text.to_string())
    }

    fn undefined() -> Self {
        Value::Undef
    }

    fn from_list(values: Vec<Self>) -> Self {
        Value::List(values)
    }
}

impl Value {
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numbers as they are, text parsed as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "undef"),
            Value::Text(text) => write!(f, "{}", text),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::List(items) => {
                let items: Vec<_> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

/// Where an action is being applied.
#[derive(Clone, Copy, Debug)]
pub struct RuleContext<'a> {
    /// LHS as written in the grammar.
    pub name: &'a str,
    pub rule: &'a Rule,
    /// Byte span of the match, leading discards excluded.
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

// Semantic actions to execute when walking the tree
pub type SemAction<'a, V> = Box<dyn Fn(&RuleContext, Vec<V>) -> V + 'a>;

/// Named semantic actions. Lookup is by exact name, each parser owns one.
pub struct ActionRegistry<'a, V> {
    actions: HashMap<String, SemAction<'a, V>>,
}

impl<'a, V> Default for ActionRegistry<'a, V> {
    fn default() -> Self {
        ActionRegistry{actions: HashMap::new()}
    }
}

impl<'a, V> ActionRegistry<'a, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<F>(mut self, name: &str, action: F) -> Self
            where F: Fn(&RuleContext, Vec<V>) -> V + 'a {
        self.action(name, action);
        self
    }

    // Non chaining registration, eg: from a loop
    pub fn action<F>(&mut self, name: &str, action: F)
            where F: Fn(&RuleContext, Vec<V>) -> V + 'a {
        self.actions.insert(name.to_string(), Box::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&SemAction<'a, V>> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<V> fmt::Debug for ActionRegistry<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionRegistry, Value};

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(" 42 ").as_f64(), Some(42.0));
        assert_eq!(Value::from("42").as_i64(), Some(42));
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from(7).as_f64(), Some(7.0));
        assert_eq!(Value::Undef.as_f64(), None);
        assert_eq!(Value::List(vec![Value::from(1), Value::from("a")]).to_string(), "[1, a]");
    }

    #[test]
    fn registry_lookup_is_exact() {
        let actions: ActionRegistry<Value> = ActionRegistry::new()
            .bind("do_add", |_, _| Value::Undef);
        assert!(actions.contains("do_add"));
        assert!(!actions.contains("do_ad"));
        assert!(!actions.contains("Do_Add"));
        assert_eq!(actions.len(), 1);
    }
}
