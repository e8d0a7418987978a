use uuid::Uuid;

use crate::domain::repository::UserRepository;
use crate::error::TrackerError;
use crate::infra::cipher::{CipherError, CredentialCipher};

/// Decrypt the user's stored provider token.
///
/// `Ok(None)` when no credential is stored. A credential that fails
/// authentication is `CorruptCredential`; the ciphertext is never handed out.
pub async fn decrypted_token<U>(
    users: &U,
    cipher: &CredentialCipher,
    user_id: Uuid,
) -> Result<Option<String>, TrackerError>
where
    U: UserRepository,
{
    let Some(sealed) = users.encrypted_token(user_id).await? else {
        return Ok(None);
    };
    match cipher.decrypt(sealed).await {
        Ok(token) => Ok(Some(token)),
        Err(CipherError::Corrupt) => {
            tracing::error!(user_id = %user_id, "stored provider credential failed to decrypt");
            Err(TrackerError::CorruptCredential)
        }
        Err(e) => Err(e.into()),
    }
}
