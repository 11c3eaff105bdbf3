use thiserror::Error;

use crate::mx::Error as MxError;
use crate::smtp::SmtpError;

/// Setup failures that prevent a run from starting. Failures during the run
/// are reported through [`MailboxStatus`](super::MailboxStatus) instead.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Mx(#[from] MxError),
    #[error(transparent)]
    Smtp(#[from] SmtpError),
}
