//! # nmacro
//!
//! A compiler and stack virtual machine for the NEdit macro language.
//!
//! Macro text is compiled in a single pass into a flat program of stack
//! instructions, then run by a [`Runtime`](mach::Runtime) in slices of a
//! fixed number of cycles so a host can stay responsive.
//!
//! ```
//! use nmacro::mach::{Event, Runtime};
//!
//! let mut runtime = Runtime::default();
//! runtime.enter("define twice {\n  return $1 * 2\n}\nreturn twice(21)\n");
//! loop {
//!     match runtime.execute(5000) {
//!         Event::Done(val) => assert_eq!(val.to_string(), "42"),
//!         Event::Stopped => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod lang;
pub mod mach;
