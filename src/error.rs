use thiserror::Error;

use crate::analysis::dataflow::Strategy;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Analyses in this crate are total: queries on unknown blocks, instructions or variables
/// degrade to the lattice bottom instead of failing. Only two conditions are surfaced as
/// errors.
///
/// # Error Categories
///
/// - [`Error::NonConvergence`] - A fixpoint solver hit its iteration cap
/// - [`Error::Malformed`] - A control-flow graph under construction references a block
///   that does not exist
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// let mut builder = CfgBuilder::new();
/// let entry = builder.add_block();
/// builder.add_edge(entry, NodeId::new(7));
///
/// match builder.build() {
///     Err(Error::Malformed { message, .. }) => println!("rejected: {message}"),
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A fixpoint solver exceeded its iteration cap.
    ///
    /// The facts computed up to this point are unsound and are discarded. This usually
    /// means the analysis supplied a non-monotone transfer function or a meet that is not
    /// idempotent.
    ///
    /// # Fields
    ///
    /// * `analysis` - Name of the analysis that failed to converge
    /// * `strategy` - The iteration strategy that was running
    /// * `limit` - The iteration cap that was exceeded
    #[error("{strategy} solver for {analysis} did not converge within {limit} iterations")]
    NonConvergence {
        /// Name of the analysis that failed to converge
        analysis: &'static str,
        /// The iteration strategy that was running
        strategy: Strategy,
        /// The iteration cap that was exceeded
        limit: usize,
    },

    /// The control-flow graph is structurally invalid.
    ///
    /// Raised by [`crate::CfgBuilder::build`] when an edge or an instruction refers to a
    /// block that was never created.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the problem
    /// * `file` - Source file where the error was raised
    /// * `line` - Source line where the error was raised
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
