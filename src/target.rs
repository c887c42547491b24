use rustc_hash::FxHashMap;

#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::encoding::LabelEncoding;
use crate::error::{ColorError, Result};

/// How the values of a target should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Numerical,
    Categorical,
}

/// Whether a target holds one value per sample or one per node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    BySample,
    ByNode,
}

impl std::str::FromStr for TargetKind {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "numerical" => Ok(TargetKind::Numerical),
            "categorical" => Ok(TargetKind::Categorical),
            _ => Err(ColorError::invalid_argument(format!(
                "data type must be 'numerical' or 'categorical', got '{}'",
                s
            ))),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sample" => Ok(Granularity::BySample),
            "node" => Ok(Granularity::ByNode),
            _ => Err(ColorError::invalid_argument(format!(
                "target values must be by 'sample' or 'node', got '{}'",
                s
            ))),
        }
    }
}

/// A single raw measurement, as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Parses a field as an integer, then a float, falling back to text
    pub fn parse(field: &str) -> Self {
        if let Ok(i) = field.parse::<i64>() {
            RawValue::Int(i)
        } else if let Ok(f) = field.parse::<f64>() {
            RawValue::Float(f)
        } else {
            RawValue::Text(field.to_string())
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, RawValue::Text(_))
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Int(i) => write!(f, "{}", i),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// A raw measurement collection, keyed either by sample position or
/// by node index
#[derive(Debug, Clone, PartialEq)]
pub enum RawTarget {
    BySample(Vec<RawValue>),
    ByNode(FxHashMap<usize, RawValue>),
}

impl RawTarget {
    pub fn granularity(&self) -> Granularity {
        match self {
            RawTarget::BySample(_) => Granularity::BySample,
            RawTarget::ByNode(_) => Granularity::ByNode,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            RawTarget::BySample(v) => v.is_empty(),
            RawTarget::ByNode(m) => m.is_empty(),
        }
    }
}

/// An ingested target: one numeric value per entity, aligned to the
/// entity index, together with the label encoding used for
/// categorical or non-numeric input.
///
/// A `Target` is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    values: Vec<f64>,
    labels: Vec<String>,
    kind: TargetKind,
    granularity: Granularity,
    encoding: Option<LabelEncoding>,
}

impl Target {
    pub fn new(raw: RawTarget, kind: TargetKind) -> Result<Self> {
        if raw.is_empty() {
            return Err(ColorError::invalid_argument(
                "target must not be empty",
            ));
        }

        let granularity = raw.granularity();

        let raw_values = match raw {
            RawTarget::BySample(values) => values,
            RawTarget::ByNode(map) => densify(map)?,
        };

        let labels: Vec<String> =
            raw_values.iter().map(|v| v.to_string()).collect();

        let all_numeric = raw_values.iter().all(RawValue::is_numeric);

        let (values, encoding) = if !all_numeric
            || kind == TargetKind::Categorical
        {
            let encoding = LabelEncoding::fit(labels.iter());
            let values = labels
                .iter()
                .filter_map(|l| encoding.encode(l))
                .map(|code| code as f64)
                .collect::<Vec<_>>();

            debug!(
                "encoded {} target values into {} labels",
                values.len(),
                encoding.len()
            );

            (values, Some(encoding))
        } else {
            let values = raw_values
                .iter()
                .filter_map(RawValue::as_f64)
                .collect::<Vec<_>>();
            (values, None)
        };

        Ok(Self {
            values,
            labels,
            kind,
            granularity,
            encoding,
        })
    }

    /// Builds a target from string-typed kind and granularity options.
    ///
    /// The granularity must agree with the shape of `raw`.
    pub fn from_strs(
        raw: RawTarget,
        kind: &str,
        target_by: &str,
    ) -> Result<Self> {
        let kind: TargetKind = kind.parse()?;
        let granularity: Granularity = target_by.parse()?;

        if granularity != raw.granularity() {
            return Err(ColorError::invalid_argument(format!(
                "target was declared by '{}' but the values are keyed by {}",
                target_by,
                match raw.granularity() {
                    Granularity::BySample => "sample",
                    Granularity::ByNode => "node",
                }
            )));
        }

        Self::new(raw, kind)
    }

    pub fn numerical<I, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        let raw =
            RawTarget::BySample(values.into_iter().map(Into::into).collect());
        Self::new(raw, TargetKind::Numerical)
    }

    pub fn categorical<I, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        let raw =
            RawTarget::BySample(values.into_iter().map(Into::into).collect());
        Self::new(raw, TargetKind::Categorical)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// String form of every raw value, aligned with `values`
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn encoding(&self) -> Option<&LabelEncoding> {
        self.encoding.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn densify(map: FxHashMap<usize, RawValue>) -> Result<Vec<RawValue>> {
    let len = match map.keys().max() {
        Some(&max) => max.checked_add(1).filter(|&len| len == map.len()),
        None => Some(0),
    };

    let len = len.ok_or_else(|| {
        ColorError::invalid_argument(format!(
            "node-level target must cover nodes 0 to {} without gaps",
            map.len().saturating_sub(1)
        ))
    })?;

    let mut dense: Vec<Option<RawValue>> = vec![None; len];
    for (ix, value) in map {
        dense[ix] = Some(value);
    }

    dense
        .into_iter()
        .enumerate()
        .map(|(ix, value)| {
            value.ok_or_else(|| {
                ColorError::invalid_argument(format!(
                    "node-level target has no value for node {}",
                    ix
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_and_granularity() {
        assert_eq!(
            "numerical".parse::<TargetKind>().unwrap(),
            TargetKind::Numerical
        );
        assert_eq!(
            "categorical".parse::<TargetKind>().unwrap(),
            TargetKind::Categorical
        );
        assert_eq!("node".parse::<Granularity>().unwrap(), Granularity::ByNode);

        assert!(matches!(
            "ordinal".parse::<TargetKind>(),
            Err(ColorError::InvalidArgument(_))
        ));
        assert!(matches!(
            "edge".parse::<Granularity>(),
            Err(ColorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn raw_value_parsing() {
        assert_eq!(RawValue::parse("3"), RawValue::Int(3));
        assert_eq!(RawValue::parse("3.5"), RawValue::Float(3.5));
        assert_eq!(RawValue::parse("male"), RawValue::Text("male".into()));
        assert!(matches!(
            RawValue::parse("nan"),
            RawValue::Float(f) if f.is_nan()
        ));
    }

    #[test]
    fn empty_target_rejected() {
        let raw = RawTarget::BySample(Vec::new());
        assert!(matches!(
            Target::new(raw, TargetKind::Numerical),
            Err(ColorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn numeric_target_kept_as_is() {
        let target = Target::numerical(vec![1.5, 2.0, f64::NAN]).unwrap();

        assert!(target.encoding().is_none());
        assert_eq!(target.len(), 3);
        assert_eq!(target.values()[0], 1.5);
        assert!(target.values()[2].is_nan());
        assert_eq!(target.granularity(), Granularity::BySample);
    }

    #[test]
    fn text_values_are_encoded_even_when_numerical() {
        let target = Target::numerical(vec!["b", "a", "b"]).unwrap();

        let enc = target.encoding().unwrap();
        assert_eq!(enc.labels(), &["a", "b"]);
        assert_eq!(target.values(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn categorical_numbers_are_encoded_as_strings() {
        let target = Target::categorical(vec![10i64, 2, 10, 9]).unwrap();

        let enc = target.encoding().unwrap();
        assert_eq!(enc.labels(), &["10", "2", "9"]);
        assert_eq!(target.values(), &[0.0, 1.0, 0.0, 2.0]);
        assert_eq!(target.labels(), &["10", "2", "10", "9"]);
    }

    #[test]
    fn labels_round_trip_through_encoding() {
        let raw = vec!["x", "y", "z", "y", "x", "w"];
        let target = Target::categorical(raw.clone()).unwrap();
        let enc = target.encoding().unwrap();

        for (value, label) in target.values().iter().zip(raw) {
            assert_eq!(enc.decode_value(*value), Some(label));
        }
    }

    #[test]
    fn node_target_is_densified() {
        let mut map = FxHashMap::default();
        map.insert(2, RawValue::Float(0.2));
        map.insert(0, RawValue::Float(0.0));
        map.insert(1, RawValue::Float(0.1));

        let target = Target::new(RawTarget::ByNode(map), TargetKind::Numerical)
            .unwrap();

        assert_eq!(target.granularity(), Granularity::ByNode);
        assert_eq!(target.values(), &[0.0, 0.1, 0.2]);
    }

    #[test]
    fn node_target_gap_rejected() {
        let mut map = FxHashMap::default();
        map.insert(0, RawValue::Float(0.0));
        map.insert(3, RawValue::Float(0.3));

        assert!(matches!(
            Target::new(RawTarget::ByNode(map), TargetKind::Numerical),
            Err(ColorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn huge_node_index_rejected() {
        for &ix in &[usize::MAX, 1_000_000_000_000] {
            let mut map = FxHashMap::default();
            map.insert(ix, RawValue::Float(1.0));

            assert!(matches!(
                Target::new(RawTarget::ByNode(map), TargetKind::Numerical),
                Err(ColorError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn from_strs_validates_options() {
        let raw = RawTarget::BySample(vec![RawValue::Int(1)]);

        assert!(Target::from_strs(raw.clone(), "numerical", "sample").is_ok());
        assert!(matches!(
            Target::from_strs(raw.clone(), "numeric", "sample"),
            Err(ColorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Target::from_strs(raw.clone(), "numerical", "nodes"),
            Err(ColorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Target::from_strs(raw, "numerical", "node"),
            Err(ColorError::InvalidArgument(_))
        ));
    }
}
