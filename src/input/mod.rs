pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{InputEvent, KeyCode, KeyModifiers, MapEvent, MouseButton};
pub use handler::{EventCallback, EventManager};
