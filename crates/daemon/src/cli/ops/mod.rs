pub mod create;
pub mod daemon;
pub mod health;
pub mod version;

pub use create::Create;
pub use daemon::Daemon;
pub use health::Health;
pub use version::Version;
