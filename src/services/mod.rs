pub mod domains;
pub mod email;
pub mod http;
pub mod identity;
pub mod storage;

pub use domains::{DomainRemoval, DomainRouter, VercelDomains};
pub use email::{EmailSender, OutgoingEmail, ResendClient};
pub use http::ClientError;
pub use identity::{IdentityProvider, SupabaseAuthAdmin, UserRemoval};
pub use storage::{ObjectStorage, StorageObject, SupabaseStorage};
