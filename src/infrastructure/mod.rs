// Infrastructure shared by the server and the sync layer

pub mod id_generator;

pub use id_generator::LocalIdGenerator;
