mod engine;
mod error;
mod store;
mod types;

pub use engine::{
    EditState, Engine, SaveReport, Session, read_binary, read_structured, write_binary,
    write_structured,
};
pub use error::{CoreError, CoreErrorCode};
pub use store::{FileStore, FsStore, MemoryStore};
pub use types::{DirEntry, EditMode, EngineConfig, FileBinaryState, OpenMode};
