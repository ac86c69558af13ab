use crate::keys::{PublicKey, Signature};
use async_trait::async_trait;

/// Capability for verifying a participant's signature over the frozen
/// transaction bytes. `SessionManager` holds one of these rather than
/// calling into a concrete signature library directly, so tests can supply
/// a fake that rejects or accepts deterministically.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;
}

/// The real Ed25519 verifier, backed by `ed25519-dalek`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Signer;

#[async_trait]
impl Signer for Ed25519Signer {
    async fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        let (Ok(key), Ok(sig)) = (public_key.to_dalek(), signature.to_dalek()) else {
            return false;
        };
        use ed25519_dalek::Verifier;
        key.verify(message, &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, Signer as _};
    use rand::rngs::OsRng;

    #[tokio::test]
    async fn verifies_a_genuine_signature() {
        let mut csprng = OsRng;
        let keypair = Keypair::generate(&mut csprng);
        let message = b"freeze me";
        let sig = keypair.sign(message);

        let public_key = PublicKey::from_bytes(keypair.public.as_bytes()).unwrap();
        let signature = Signature::from_bytes(&sig.to_bytes()).unwrap();

        assert!(Ed25519Signer.verify(&public_key, message, &signature).await);
    }

    #[tokio::test]
    async fn rejects_a_tampered_message() {
        let mut csprng = OsRng;
        let keypair = Keypair::generate(&mut csprng);
        let sig = keypair.sign(b"freeze me");

        let public_key = PublicKey::from_bytes(keypair.public.as_bytes()).unwrap();
        let signature = Signature::from_bytes(&sig.to_bytes()).unwrap();

        assert!(
            !Ed25519Signer
                .verify(&public_key, b"freeze me, differently", &signature)
                .await
        );
    }
}
