use bytes::Bytes;

use crate::error::Result;

/// Datagram encryption hook.
///
/// When a room is built with a cipher, every outbound datagram goes through
/// [`Cipher::encrypt`] and every inbound one through [`Cipher::decrypt`].
/// RPC frames are never touched. A decrypt failure drops that datagram only.
pub trait Cipher: Send + Sync + 'static {
    fn encrypt(&self, plain: &[u8]) -> Result<Bytes>;

    fn decrypt(&self, sealed: &[u8]) -> Result<Bytes>;
}
