mod chrome_finder;
mod error;
mod profile;
mod session;

pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use profile::ProfileManager;
pub use session::{ChromeSession, LaunchOptions};
