use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Group keys and selector sets use `BTreeMap` / `BTreeSet`, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Infer the type of a raw text cell (CSV).
    pub fn infer(s: &str) -> Value {
        let s = s.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return if f.is_nan() { Value::Null } else { Value::Float(f) };
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::Text(s.to_string())
    }

    /// Interpret the value as an `f64` for numeric work.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

static NULL: Value = Value::Null;

/// A single row: column name → value. Absent columns read as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Record { values }
    }

    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All rows, in source order.
    pub rows: Vec<Record>,
    /// Column names in header order.
    pub column_names: Vec<String>,
    /// For each column the sorted set of distinct values (nulls included).
    pub unique_values: BTreeMap<String, BTreeSet<Value>>,
    /// Columns whose non-null values are all numeric (and at least one exists).
    pub numeric: BTreeSet<String>,
}

impl Dataset {
    /// Build column indices from the loaded rows.
    ///
    /// `columns` keeps the header order; columns that only appear in rows are
    /// appended in name order.
    pub fn from_records(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut column_names = columns;
        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = BTreeMap::new();
        let mut saw_number: BTreeSet<String> = BTreeSet::new();
        let mut saw_other: BTreeSet<String> = BTreeSet::new();

        for row in &rows {
            for (col, val) in &row.values {
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
                if val.is_numeric() {
                    saw_number.insert(col.clone());
                } else if !val.is_null() {
                    saw_other.insert(col.clone());
                }
            }
        }

        let mut extra: Vec<String> = unique_values
            .keys()
            .filter(|c| !column_names.contains(c))
            .cloned()
            .collect();
        column_names.append(&mut extra);

        for col in &column_names {
            unique_values.entry(col.clone()).or_default();
        }

        let numeric = saw_number.difference(&saw_other).cloned().collect();

        Dataset {
            rows,
            column_names,
            unique_values,
            numeric,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.unique_values.contains_key(column)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.contains(column)
    }

    /// Distinct non-null values of a column, ascending.
    pub fn distinct(&self, column: &str) -> Vec<Value> {
        self.unique_values
            .get(column)
            .map(|vals| vals.iter().filter(|v| !v.is_null()).cloned().collect())
            .unwrap_or_default()
    }

    /// Numeric columns in header order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|c| self.numeric.contains(*c))
            .cloned()
            .collect()
    }

    /// Non-numeric columns in header order.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|c| !self.numeric.contains(*c))
            .cloned()
            .collect()
    }

    /// Non-missing numeric values of `column` over the given rows.
    pub fn numeric_values(&self, column: &str, rows: &[usize]) -> Vec<f64> {
        rows.iter()
            .filter_map(|&i| self.rows[i].get(column).as_f64())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_cell_types() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer(" 2020 "), Value::Integer(2020));
        assert_eq!(Value::infer("3.5"), Value::Float(3.5));
        assert_eq!(Value::infer("true"), Value::Bool(true));
        assert_eq!(Value::infer("Punjab"), Value::Text("Punjab".into()));
        assert_eq!(Value::infer("NaN"), Value::Null);
    }

    #[test]
    fn values_order_by_type_then_content() {
        let mut set = BTreeSet::new();
        set.insert(Value::from("b"));
        set.insert(Value::Integer(3));
        set.insert(Value::Null);
        set.insert(Value::from("a"));
        set.insert(Value::Integer(1));
        let ordered: Vec<Value> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                Value::Null,
                Value::Integer(1),
                Value::Integer(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn dataset_detects_numeric_columns() {
        let rows = vec![
            Record::from_iter([("State", Value::from("A")), ("MSP", Value::Float(1.5))]),
            Record::from_iter([("State", Value::from("B")), ("MSP", Value::Null)]),
            Record::from_iter([("State", Value::from("C")), ("MSP", Value::Integer(2))]),
        ];
        let ds = Dataset::from_records(vec!["State".into(), "MSP".into()], rows);
        assert_eq!(ds.numeric_columns(), vec!["MSP".to_string()]);
        assert_eq!(ds.categorical_columns(), vec!["State".to_string()]);
        assert_eq!(ds.distinct("State").len(), 3);
        assert_eq!(ds.numeric_values("MSP", &[0, 1, 2]), vec![1.5, 2.0]);
        assert!(ds.has_column("MSP"));
        assert!(!ds.has_column("Yield"));
    }

    #[test]
    fn header_only_columns_are_known() {
        let ds = Dataset::from_records(vec!["State".into(), "year".into()], Vec::new());
        assert!(ds.is_empty());
        assert!(ds.has_column("year"));
        assert!(ds.distinct("year").is_empty());
        assert!(ds.numeric_columns().is_empty());
    }
}
