//! Container decryption helpers

use aes::{
    cipher::{generic_array::GenericArray, BlockDecrypt, BlockSizeUser, KeyInit},
    Aes256,
};

/// Aes256 block alignment
pub const ENCRYPTION_ALIGN: u64 = 16;

/// Aes256 encryption key
pub type EncryptionKey = [u8; 32];

/// Create a cipher from a raw key
pub fn create_cipher(key: &EncryptionKey) -> Aes256 {
    Aes256::new(&GenericArray::from(*key))
}

/// Decrypt data that is aligned to aes256 block size
pub fn decrypt(aes: &Aes256, data: &mut [u8]) {
    data.chunks_mut(Aes256::block_size())
        .map(GenericArray::from_mut_slice)
        .for_each(|e| aes.decrypt_block(e));
}
