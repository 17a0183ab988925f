//! Compiler for programmable-FSM peripherals.
//!
//! Some peripherals implement their finite state machine as a programmable
//! lookup table (LUT): for every (state, input combination) pair the LUT
//! memory stores the next-state index and the output bus value. `fsm2lut`
//! takes a symbolic description of such a machine — labeled states with
//! ternary input conditions, jump targets and output expressions — and
//! compiles it into the dense binary image the firmware loader writes into
//! that memory.
//!
//! # Usage
//!
//! As a command line tool, reading a YAML or JSON program description:
//!
//! ```text
//! $ fsm2lut -i blink.yaml -o blink.bin
//! ```
//!
//! Or as a library:
//!
//! ```
//! use fsm2lut::{FsmProgram, StateRecord};
//!
//! let mut program = FsmProgram::new(4, 2, 16);
//! program.add_record(StateRecord::new("idle", "10", "run", 0u64));
//! program.add_record(StateRecord::new("run", "", "", "2 | (i[1] & i[0])"));
//! let image = fsm2lut::encode(&program)?;
//! assert_eq!(image.len(), 2 * 4 * 4); // 2 states x 4 combinations x 4 bytes
//! # Ok::<(), fsm2lut::Error>(())
//! ```
//!
//! # Encoding contract
//!
//! Records are numbered by position, 0-based. For every state, in record
//! order, and every input combination, in ascending numeric order, one LUT
//! entry is emitted:
//!
//! - the next state is the resolved jump target when the record's ternary
//!   condition matches the input, otherwise `state + 1`;
//! - the output is the record's constant, or its expression evaluated over
//!   the `input_w`-bit vector `i` (see [`expr`]), or 0;
//! - the entry packs `(next_state << output_w) | output`, split across
//!   `ceil((state_w + output_w) / data_w)` big-endian data words (see
//!   [`lut`]).
//!
//! Any malformed condition, unresolved label or bad expression aborts the
//! encode before a single byte is produced.

pub mod cond;
pub mod config;
mod errors;
pub mod expr;
pub mod lut;
pub mod program;
mod util;

pub use crate::errors::{Error, Result};
pub use crate::lut::encode;
pub use crate::program::{FsmProgram, OutputSpec, StateRecord};
