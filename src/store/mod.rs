pub mod schema;
pub mod session_store;

pub use schema::SessionSnapshot;
pub use session_store::SessionStore;
