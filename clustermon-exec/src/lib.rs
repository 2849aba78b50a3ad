//! Check (and notification) command execution: macro resolution, a
//! child-process pool with bounded timeouts, and plugin-output/perfdata
//! parsing (spec §4.3, §4.10, §5).

pub mod error;
pub mod macros;
pub mod output;
pub mod pool;
pub mod process;

pub use error::ExecError;
pub use macros::{MacroScope, MapScope, Resolver, VarsScope};
pub use output::{parse as parse_output, ParsedOutput};
pub use pool::{CheckJob, ExecutorPool, ResultSink};
pub use process::{run as run_process, ExecutedProcess, SYNTHETIC_FAILURE_EXIT};
