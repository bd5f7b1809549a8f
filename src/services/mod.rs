pub mod blob;
pub mod celebration;
pub mod identity;
pub mod mailer;

pub use blob::{BlobStore, VercelBlobStore};
pub use celebration::{Celebrate, CelebrationMailer};
pub use identity::{Anonymous, IdentityProvider, StackAuth};
pub use mailer::ResendMailer;
