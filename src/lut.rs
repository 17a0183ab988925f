//! LUT encoding.
//!
//! The peripheral's programmable memory holds one entry per (state, input
//! combination) pair. Each entry packs the next-state index into the high
//! bits and the output value into the low `output_w` bits:
//!
//! ```text
//! entry = (next_state << output_w) | output
//! ```
//!
//! When `state_w + output_w` exceeds the CPU data word, the entry is split
//! big-endian across `ceil((state_w + output_w) / data_w)` words: word 0
//! carries the most significant `data_w` bits (zero padded at the top) and
//! is emitted first, matching the loader, which programs word-select 0
//! first. Every word is serialized as `data_w`-bit big-endian bytes.
//!
//! Entries are emitted state-major: all input combinations of state 0 in
//! ascending numeric order, then state 1, and so on. States beyond the last
//! record up to `2^state_w - 1` are not emitted; the hardware treats that
//! memory as don't-care.

use std::io::Write;

use log::{debug, info};

use crate::cond::TernaryPattern;
use crate::errors::{Error, Result};
use crate::expr::Expr;
use crate::program::{FsmProgram, OutputSpec};
use crate::util::{bits_required, mask, to_binary_string, BITS_PER_BYTE};

/// Number of data words per (state, input combination) LUT entry.
pub fn words_per_entry(program: &FsmProgram) -> u32 {
    (program.state_w + program.output_w).div_ceil(program.data_w)
}

/// Encode the whole program into the LUT byte image.
///
/// The program is compiled and checked in full before the first byte is
/// produced, so a failed encode never yields partial output. Encoding does
/// not mutate the program: identical programs produce identical images.
pub fn encode(program: &FsmProgram) -> Result<Vec<u8>> {
    let compiled = compile(program)?;

    let words = words_per_entry(program);
    let bytes_per_word = (program.data_w / BITS_PER_BYTE) as usize;
    let combinations = 1u64 << program.input_w;
    let mut image = Vec::with_capacity(
        compiled.len() * combinations as usize * words as usize * bytes_per_word,
    );

    for record in &compiled {
        debug!(
            "state {} ({:?}): {} entries of {} word(s)",
            record.index, record.label, combinations, words
        );
        for input in 0..combinations {
            let next = record.next_state(input);
            let output = record.output(input, program.input_w).map_err(|source| {
                Error::Expression {
                    state: record.index,
                    input: Some(input),
                    source,
                }
            })?;

            let entry = (u128::from(next) & mask(program.state_w)) << program.output_w
                | u128::from(output) & mask(program.output_w);

            for w in 0..words {
                let shift = (words - 1 - w) * program.data_w;
                let word = ((entry >> shift) & mask(program.data_w)) as u64;
                for b in (0..bytes_per_word).rev() {
                    image.push((word >> (b as u32 * BITS_PER_BYTE)) as u8);
                }
            }
        }
    }

    info!(
        "encoded {} state(s) x {} input combination(s) into {} bytes",
        compiled.len(),
        combinations,
        image.len()
    );
    Ok(image)
}

/// Next-state index for one (state, input combination) pair.
///
/// Falls through to `state + 1` when the record has no transition configured
/// (empty `next_state` or empty `input_cond`) or when the condition does not
/// match. No bounds check is made against the record count: the fallthrough
/// of the final state addresses a state that does not exist, and avoiding
/// that is the program author's responsibility.
pub fn next_state(program: &FsmProgram, state: usize, input: u64) -> Result<u64> {
    let compiled = compile(program)?;
    let record = compiled.get(state).ok_or(Error::NoSuchState {
        state,
        len: compiled.len(),
    })?;
    Ok(record.next_state(input))
}

/// Output value for one (state, input combination) pair, masked to
/// `output_w` bits at packing time, not here.
pub fn evaluate_output(program: &FsmProgram, state: usize, input: u64) -> Result<u64> {
    let compiled = compile(program)?;
    let record = compiled.get(state).ok_or(Error::NoSuchState {
        state,
        len: compiled.len(),
    })?;
    record.output(input, program.input_w).map_err(|source| Error::Expression {
        state,
        input: Some(input),
        source,
    })
}

/// Print the output truth table of one state to `sink`, one line per input
/// combination: `<binary-combination>: <output>`, combination zero padded to
/// `input_w` digits.
///
/// Purely diagnostic; encoder state is not touched.
pub fn truth_table(program: &FsmProgram, state: usize, sink: &mut impl Write) -> Result<()> {
    let compiled = compile(program)?;
    let record = compiled.get(state).ok_or(Error::NoSuchState {
        state,
        len: compiled.len(),
    })?;

    info!(
        "truth table for state {} ({:?}), output {:?}",
        record.index,
        record.label,
        program.records()[state].output_expr
    );
    for input in 0..1u64 << program.input_w {
        let output = record.output(input, program.input_w).map_err(|source| {
            Error::Expression {
                state,
                input: Some(input),
                source,
            }
        })?;
        writeln!(
            sink,
            "{}: {}",
            to_binary_string(input, program.input_w),
            output
        )?;
    }
    Ok(())
}

/// A record with its condition, jump target and output expression resolved.
struct CompiledRecord {
    index: usize,
    label: String,
    cond: Option<TernaryPattern>,
    target: Option<u64>,
    output: CompiledOutput,
}

enum CompiledOutput {
    Zero,
    Const(u64),
    Expr(Expr),
}

impl CompiledRecord {
    fn next_state(&self, input: u64) -> u64 {
        match (self.target, self.cond) {
            // A transition needs both a target and a condition; a matching
            // input takes the jump, anything else falls through.
            (Some(target), Some(cond)) if cond.matches(input) => target,
            _ => self.index as u64 + 1,
        }
    }

    fn output(&self, input: u64, input_w: u32) -> std::result::Result<u64, crate::expr::ExprError> {
        match &self.output {
            CompiledOutput::Zero => Ok(0),
            CompiledOutput::Const(v) => Ok(*v),
            CompiledOutput::Expr(e) => e.eval(input, input_w),
        }
    }
}

fn check_geometry(program: &FsmProgram) -> Result<()> {
    let fail = |reason: String| Err(Error::Geometry(reason));

    if program.state_w == 0 || program.input_w == 0 || program.output_w == 0 {
        return fail("state_w, input_w and output_w must all be positive".into());
    }
    if program.data_w == 0 || program.data_w % BITS_PER_BYTE != 0 || program.data_w > 64 {
        return fail(format!(
            "data_w must be a multiple of 8 between 8 and 64, got {}",
            program.data_w
        ));
    }
    if program.input_w > 16 {
        return fail(format!(
            "input_w {} is too wide (LUT grows as 2^input_w; the limit is 16)",
            program.input_w
        ));
    }
    if program.state_w + program.output_w > 128 {
        return fail(format!(
            "state_w + output_w = {} exceeds the 128-bit entry limit",
            program.state_w + program.output_w
        ));
    }
    let len = program.records().len();
    if len > 1 {
        let needed = bits_required(len as u64 - 1);
        if needed > program.state_w {
            return fail(format!(
                "state_w {} cannot index {} records ({} bits needed)",
                program.state_w, len, needed
            ));
        }
    }
    Ok(())
}

/// Validate the program and resolve every record.
///
/// All configuration errors surface here, before any output is generated:
/// malformed conditions, unknown labels (resolved even when the condition is
/// empty and the transition can never fire) and expression parse errors,
/// each reported with the offending state index.
fn compile(program: &FsmProgram) -> Result<Vec<CompiledRecord>> {
    check_geometry(program)?;

    let labels = program.label_map();
    let mut compiled = Vec::with_capacity(program.records().len());

    for (index, record) in program.records().iter().enumerate() {
        let cond = if record.input_cond.is_empty() {
            None
        } else {
            Some(
                TernaryPattern::parse(&record.input_cond, program.input_w).map_err(|reason| {
                    Error::MalformedCondition {
                        state: index,
                        pattern: record.input_cond.clone(),
                        reason,
                    }
                })?,
            )
        };

        let target = if record.next_state.is_empty() {
            None
        } else {
            let target = *labels
                .get(record.next_state.as_str())
                .ok_or_else(|| Error::UnknownLabel {
                    state: index,
                    label: record.next_state.clone(),
                })?;
            Some(target as u64)
        };

        let output = match &record.output_expr {
            OutputSpec::None => CompiledOutput::Zero,
            OutputSpec::Const(v) => CompiledOutput::Const(*v),
            OutputSpec::Expr(src) => CompiledOutput::Expr(
                Expr::parse(src, program.input_w).map_err(|source| Error::Expression {
                    state: index,
                    input: None,
                    source,
                })?,
            ),
        };

        compiled.push(CompiledRecord {
            index,
            label: record.label.clone(),
            cond,
            target,
            output,
        });
    }

    Ok(compiled)
}
