mod credential;
mod custom_model;
mod message;
mod thread;

pub use credential::MongoCredentialRepository;
pub use custom_model::MongoCustomModelRepository;
pub use message::MongoMessageRepository;
pub use thread::MongoThreadRepository;
