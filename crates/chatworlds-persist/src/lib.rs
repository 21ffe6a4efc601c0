pub mod builder;
pub mod dbs;
pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

pub use builder::{StoreBackend, StoreBuilder};
pub use error::PersistError;
pub use memory::MemoryStore;
pub use models::{
    Credential, CustomModel, CustomModelInput, Message, MessageRole, NewMessage, NewThread, Thread,
    ThreadPatch,
};
pub use traits::{CredentialStore, CustomModelStore, MessageStore, Store, ThreadStore};

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoStore;
