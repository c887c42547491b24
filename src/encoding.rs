use rustc_hash::FxHashMap;

/// A frozen bijection between distinct string labels and dense
/// integer codes in `0..len()`.
///
/// Codes are assigned in lexicographic order of the labels, so the
/// encoding does not depend on the order labels were seen in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelEncoding {
    labels: Vec<String>,
    codes: FxHashMap<String, usize>,
}

impl LabelEncoding {
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> =
            labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        sorted.sort();
        sorted.dedup();

        let codes = sorted
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code))
            .collect();

        Self {
            labels: sorted,
            codes,
        }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(|s| s.as_str())
    }

    /// Decodes a code stored in a numeric target column
    pub fn decode_value(&self, value: f64) -> Option<&str> {
        if value.is_nan() || value < 0.0 || value.fract() != 0.0 {
            return None;
        }
        self.decode(value as usize)
    }

    /// The distinct labels, sorted; the index of a label is its code
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
