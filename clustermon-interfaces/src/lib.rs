//! External interfaces (spec §4.8, §6): the command pipe verb registry,
//! the IDO sink seam, the compat status writer, and the perfdata sink.

pub mod command;
pub mod error;
pub mod ido;
pub mod perfdata;
pub mod source;
pub mod status;

pub use command::{parse_line, CommandRegistry, ExternalCommand};
pub use error::InterfaceError;
pub use ido::{IdoEvent, IdoHeartbeat, IdoQueryKind, IdoSink, NullIdoSink, RecordingIdoSink};
pub use perfdata::{NullPerfdataSink, PerfdataSink, RecordedPerfdata, RecordingPerfdataSink};
pub use source::FileCommandSource;
pub use status::{CompatStatusSource, ProgramStatus, StatusFlags, StatusSnapshotSource, write_status_file};
