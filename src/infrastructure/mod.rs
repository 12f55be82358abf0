pub mod session;

pub use session::{BrowserSession, ChromeSession, ChromeSessionFactory, LinkElement, SessionFactory};
