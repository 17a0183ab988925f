//! Symbolic FSM program description.
//!
//! A program is an ordered list of [`StateRecord`]s plus the geometry quartet
//! (`state_w`, `input_w`, `output_w`, `data_w`). The position of a record in
//! the list is its state number: numbering is insertion order, 0-based, and
//! never changes once assigned. Jump targets reference records by label, not
//! by index, and are resolved when the program is encoded.

use std::collections::HashMap;

/// Output specification of one state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputSpec {
    /// No output configured; the state outputs 0.
    #[default]
    None,
    /// A constant output value, independent of the input combination.
    Const(u64),
    /// An expression over the input bit vector `i`, evaluated per input
    /// combination. See [`crate::expr`] for the language.
    Expr(String),
}

impl From<u64> for OutputSpec {
    fn from(v: u64) -> Self {
        OutputSpec::Const(v)
    }
}

impl From<i32> for OutputSpec {
    /// Negative constants wrap to their two's-complement bit pattern and are
    /// masked to `output_w` bits when packed.
    fn from(v: i32) -> Self {
        OutputSpec::Const(v as u64)
    }
}

impl From<&str> for OutputSpec {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            OutputSpec::None
        } else {
            OutputSpec::Expr(s.to_string())
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for OutputSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected, Visitor};

        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = OutputSpec;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter
                    .write_str("an output specification: integer, expression string, or null")
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(OutputSpec::Const(v))
            }

            fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(OutputSpec::Const)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(OutputSpec::from(v))
            }

            fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
                Ok(OutputSpec::None)
            }

            fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
                Ok(OutputSpec::None)
            }

            fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(SpecVisitor)
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

/// One state of the FSM.
///
/// Field names follow the peripheral's original programming tool so existing
/// program descriptions carry over unchanged.
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields, default))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateRecord {
    /// State label, referenced by other records' `next_state`. Empty when
    /// the state is never jumped to.
    pub label: String,
    /// Ternary pattern over the input bus, one character per bit, leftmost
    /// character is the most significant bit. Example: `"--10"` matches
    /// whenever input bits [1:0] read `10`. Empty means no condition is
    /// configured and the state always falls through.
    pub input_cond: String,
    /// Label to jump to when `input_cond` matches. Empty means no transition
    /// is configured: the next state is always the following record.
    pub next_state: String,
    /// Output value of this state.
    pub output_expr: OutputSpec,
}

impl StateRecord {
    pub fn new(
        label: &str,
        input_cond: &str,
        next_state: &str,
        output_expr: impl Into<OutputSpec>,
    ) -> Self {
        Self {
            label: label.to_string(),
            input_cond: input_cond.to_string(),
            next_state: next_state.to_string(),
            output_expr: output_expr.into(),
        }
    }
}

/// An FSM program: geometry plus the ordered state records.
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsmProgram {
    /// Bits of the state index (the peripheral holds `2^state_w` LUT rows
    /// per input combination).
    pub state_w: u32,
    /// Bits of the peripheral input bus.
    pub input_w: u32,
    /// Bits of the peripheral output bus.
    pub output_w: u32,
    /// CPU data word width of the LUT memory port.
    #[cfg_attr(feature = "serde", serde(default = "default_data_w"))]
    pub data_w: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    records: Vec<StateRecord>,
}

fn default_data_w() -> u32 {
    32
}

impl FsmProgram {
    /// An empty program with the given widths and the default 32-bit data
    /// word.
    pub fn new(state_w: u32, input_w: u32, output_w: u32) -> Self {
        Self {
            state_w,
            input_w,
            output_w,
            data_w: default_data_w(),
            records: Vec::new(),
        }
    }

    /// Append a record; its state number is the current record count.
    pub fn add_record(&mut self, record: StateRecord) {
        self.records.push(record);
    }

    /// Replace the whole record list.
    pub fn set_records(&mut self, records: Vec<StateRecord>) {
        self.records = records;
    }

    pub fn records(&self) -> &[StateRecord] {
        &self.records
    }

    /// Build the label-to-index map for this program.
    ///
    /// Built once per encode rather than scanned per lookup. The first
    /// record carrying a label wins, matching first-match linear scan
    /// semantics; empty labels are not addressable.
    pub fn label_map(&self) -> HashMap<&str, usize> {
        let mut map = HashMap::with_capacity(self.records.len());
        for (index, record) in self.records.iter().enumerate() {
            if !record.label.is_empty() {
                map.entry(record.label.as_str()).or_insert(index);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_number_is_insertion_order() {
        let mut program = FsmProgram::new(2, 1, 1);
        program.add_record(StateRecord::new("A", "", "", 0));
        program.add_record(StateRecord::new("B", "", "", 0));
        program.add_record(StateRecord::new("C", "", "", 0));
        let map = program.label_map();
        assert_eq!(map["A"], 0);
        assert_eq!(map["B"], 1);
        assert_eq!(map["C"], 2);
    }

    #[test]
    fn first_label_occurrence_wins() {
        let mut program = FsmProgram::new(2, 1, 1);
        program.add_record(StateRecord::new("A", "", "", 0));
        program.add_record(StateRecord::new("A", "", "", 0));
        assert_eq!(program.label_map()["A"], 0);
    }

    #[test]
    fn empty_labels_are_not_addressable() {
        let mut program = FsmProgram::new(2, 1, 1);
        program.add_record(StateRecord::new("", "", "", 0));
        assert!(program.label_map().is_empty());
    }

    #[test]
    fn output_spec_from_str() {
        assert_eq!(OutputSpec::from(""), OutputSpec::None);
        assert_eq!(OutputSpec::from("i[0]"), OutputSpec::Expr("i[0]".into()));
        assert_eq!(OutputSpec::from(7u64), OutputSpec::Const(7));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn deserialize_yaml_program() {
        let src = "\
state_w: 4
input_w: 2
output_w: 16
records:
  - label: A
    input_cond: \"10\"
    next_state: B
    output_expr: 1
  - label: B
    output_expr: \"2 | (i[1] & i[0])\"
";
        let program: FsmProgram = serde_yaml::from_str(src).unwrap();
        assert_eq!(program.data_w, 32); // default
        assert_eq!(program.records().len(), 2);
        assert_eq!(program.records()[0].output_expr, OutputSpec::Const(1));
        assert_eq!(
            program.records()[1].output_expr,
            OutputSpec::Expr("2 | (i[1] & i[0])".into())
        );
        assert_eq!(program.records()[1].input_cond, "");
    }

    #[cfg(feature = "json")]
    #[test]
    fn unsupported_output_spec_is_rejected() {
        let src = r#"{
            "state_w": 1, "input_w": 1, "output_w": 1,
            "records": [{"label": "A", "output_expr": [1, 2]}]
        }"#;
        let err = serde_json::from_str::<FsmProgram>(src).unwrap_err();
        assert!(err.to_string().contains("output specification"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn null_output_spec_means_zero() {
        let src = r#"{
            "state_w": 1, "input_w": 1, "output_w": 1,
            "records": [{"label": "A", "output_expr": null}]
        }"#;
        let program: FsmProgram = serde_json::from_str(src).unwrap();
        assert_eq!(program.records()[0].output_expr, OutputSpec::None);
    }
}
