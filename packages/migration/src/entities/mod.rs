pub mod todos;

pub use todos::Entity as Todos;
pub use todos::Model as Todo;
pub use todos::TagList;
