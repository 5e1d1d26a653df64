//! # Dex test parser
//!
//! Find the JUnit3 and JUnit4 test methods compiled into an Android APK by reading the
//! dex format directly, without loading any code.
//!
//! ```no_run
//!  use dex_test_parser::apk::find_test_names_in_apk;
//!
//!  let names = find_test_names_in_apk("app-debug-androidTest.apk", &[]).unwrap();
//!  for name in names {
//!      println!("{}", name);
//!  }
//! ```
//!
//! Segments that are already in memory go through [`find_test_methods`] or
//! [`find_test_names`] directly.

pub mod apk;
pub mod dex;
pub mod parser;
#[cfg(test)]
mod tests;

pub use crate::dex::error::{DexError, DexErrorKind};
pub use crate::parser::{find_test_methods, find_test_names, DecodedValue, TestAnnotation, TestMethod};
