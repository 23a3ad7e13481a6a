//! Search domains: `[field, operator, value]` terms combined with prefix operators.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  In,
  NotIn,
  Like,
  ILike,
}

impl Operator {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operator::Eq => "=",
      Operator::Ne => "!=",
      Operator::Lt => "<",
      Operator::Le => "<=",
      Operator::Gt => ">",
      Operator::Ge => ">=",
      Operator::In => "in",
      Operator::NotIn => "not in",
      Operator::Like => "like",
      Operator::ILike => "ilike",
    }
  }
}

/// A search filter tree, serialized to Odoo's flat prefix notation.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
  Term {
    field: String,
    op: Operator,
    value: Value,
  },
  And(Vec<Domain>),
  Or(Vec<Domain>),
  Not(Box<Domain>),
}

impl Domain {
  /// Matches every record.
  pub fn all() -> Self {
    Domain::And(Vec::new())
  }

  pub fn term(field: &str, op: Operator, value: impl Into<Value>) -> Self {
    Domain::Term {
      field: field.to_string(),
      op,
      value: value.into(),
    }
  }

  pub fn eq(field: &str, value: impl Into<Value>) -> Self {
    Self::term(field, Operator::Eq, value)
  }

  pub fn ids(ids: &[i64]) -> Self {
    Self::term("id", Operator::In, json!(ids))
  }

  pub fn and(items: impl IntoIterator<Item = Domain>) -> Self {
    Domain::And(items.into_iter().collect())
  }

  pub fn or(items: impl IntoIterator<Item = Domain>) -> Self {
    Domain::Or(items.into_iter().collect())
  }

  #[allow(clippy::should_implement_trait)]
  pub fn not(inner: Domain) -> Self {
    Domain::Not(Box::new(inner))
  }

  /// Both this domain and `other`.
  pub fn and_also(self, other: Domain) -> Self {
    match self {
      Domain::And(mut items) => {
        items.push(other);
        Domain::And(items)
      }
      single => Domain::And(vec![single, other]),
    }
  }

  /// True when the domain has no terms at all.
  pub fn is_empty(&self) -> bool {
    match self {
      Domain::Term { .. } => false,
      Domain::And(items) | Domain::Or(items) => items.iter().all(Domain::is_empty),
      Domain::Not(inner) => inner.is_empty(),
    }
  }

  /// The JSON array expected by `search`/`search_read`.
  pub fn to_value(&self) -> Value {
    let mut out = Vec::new();
    self.push_prefix(&mut out);
    Value::Array(out)
  }

  fn push_prefix(&self, out: &mut Vec<Value>) {
    match self {
      Domain::Term { field, op, value } => out.push(json!([field, op.as_str(), value])),
      Domain::And(items) => push_nary("&", items, out),
      Domain::Or(items) => push_nary("|", items, out),
      Domain::Not(inner) => {
        if !inner.is_empty() {
          out.push(json!("!"));
          inner.push_prefix(out);
        }
      }
    }
  }
}

/// An n-ary operator becomes n-1 binary prefix operators followed by the operands.
fn push_nary(op: &str, items: &[Domain], out: &mut Vec<Value>) {
  let items: Vec<&Domain> = items.iter().filter(|d| !d.is_empty()).collect();
  for _ in 1..items.len() {
    out.push(json!(op));
  }
  for item in items {
    item.push_prefix(out);
  }
}
