//! Key derivation and the password based ciphers of PKCS#12.
//!
//! Three paths:
//! 1. PKCS#12 KDF (RFC 7292 Appendix B) for MAC keys and legacy PBE
//! 2. Legacy PBE: pbeWithSHAAnd3-KeyTripleDES-CBC and the RC2-CBC variants
//! 3. PBES2: PBKDF2 + AES-CBC (OpenSSL 3.x default)

use super::Pkcs12Error;
use cbc::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyIvInit,
};
use hmac::{Hmac, Mac};
use rc2::Rc2;
use sha1::Sha1;
use sha2::digest::FixedOutputReset;
use sha2::{Digest, Sha256, Sha512};

type Des3CbcEnc = cbc::Encryptor<des::TdesEde3>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;
type Rc2CbcEnc = cbc::Encryptor<Rc2>;
type Rc2CbcDec = cbc::Decryptor<Rc2>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// PKCS#12 KDF ID values (RFC 7292 Appendix B.3).
pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// Digest behind the PKCS#12 KDF and the integrity MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacDigest {
    Sha1,
    Sha256,
    Sha512,
}

impl MacDigest {
    /// Length of the HMAC key (and tag) for this digest
    pub fn output_len(self) -> usize {
        match self {
            MacDigest::Sha1 => 20,
            MacDigest::Sha256 => 32,
            MacDigest::Sha512 => 64,
        }
    }

    /// Run the PKCS#12 KDF with this digest.
    ///
    /// `password` is BMP encoded, see [`password_to_bmp`].
    pub fn derive(
        self,
        id: u8,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Vec<u8> {
        match self {
            MacDigest::Sha1 => pkcs12_kdf::<Sha1>(id, password, salt, iterations, output_len, 64),
            MacDigest::Sha256 => {
                pkcs12_kdf::<Sha256>(id, password, salt, iterations, output_len, 64)
            }
            MacDigest::Sha512 => {
                pkcs12_kdf::<Sha512>(id, password, salt, iterations, output_len, 128)
            }
        }
    }

    /// HMAC over `data` keyed with `key`
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Pkcs12Error> {
        let tag = match self {
            MacDigest::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| Pkcs12Error::Mac)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            MacDigest::Sha256 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).map_err(|_| Pkcs12Error::Mac)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            MacDigest::Sha512 => {
                let mut mac =
                    Hmac::<Sha512>::new_from_slice(key).map_err(|_| Pkcs12Error::Mac)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(tag)
    }
}

/// PKCS#12 KDF (RFC 7292 Appendix B).
///
/// `v` is the digest block size in bytes: 64 for SHA-1/SHA-256, 128 for SHA-512.
fn pkcs12_kdf<D>(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
    v: usize,
) -> Vec<u8>
where
    D: Digest + FixedOutputReset,
{
    let u = <D as Digest>::output_size();
    let d_block = vec![id; v];

    let s = extend_to_multiple(salt, v);
    let p = extend_to_multiple(password, v);

    let mut i_block = Vec::with_capacity(s.len() + p.len());
    i_block.extend_from_slice(&s);
    i_block.extend_from_slice(&p);

    let num_blocks = output_len.div_ceil(u);
    let mut result = Vec::with_capacity(num_blocks * u);

    for block_idx in 0..num_blocks {
        let mut hasher = D::new();
        Digest::update(&mut hasher, &d_block);
        Digest::update(&mut hasher, &i_block);
        let mut a = hasher.finalize_reset();

        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }

        result.extend_from_slice(&a);

        if block_idx + 1 < num_blocks {
            let b = extend_to_multiple(&a, v);
            for j in 0..(i_block.len() / v) {
                add_one_plus_b(&mut i_block[j * v..(j + 1) * v], &b);
            }
        }
    }

    result.truncate(output_len);
    result
}

/// Repeat `data` up to the next multiple of `v` bytes. Empty stays empty.
fn extend_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(v*8)`
fn add_one_plus_b(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for k in (0..block.len()).rev() {
        let sum = block[k] as u16 + b[k] as u16 + carry;
        block[k] = sum as u8;
        carry = sum >> 8;
    }
}

/// Encode a password as BMP (UTF-16BE) with two trailing zero bytes.
///
/// The empty password maps to an empty string; callers that need the
/// two-zero-byte form for interoperability try both.
pub fn password_to_bmp(password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut bmp = Vec::with_capacity(password.len() * 2 + 2);
    for c in password.encode_utf16() {
        bmp.extend_from_slice(&c.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// Legacy PKCS#12 PBE schemes (RFC 7292 Appendix C), all SHA-1 based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCipher {
    TripleDes,
    Rc2With128BitKey,
    Rc2With40BitKey,
}

impl LegacyCipher {
    fn key_len(self) -> usize {
        match self {
            LegacyCipher::TripleDes => 24,
            LegacyCipher::Rc2With128BitKey => 16,
            LegacyCipher::Rc2With40BitKey => 5,
        }
    }

    fn key_and_iv(self, password: &[u8], salt: &[u8], iterations: u32) -> (Vec<u8>, Vec<u8>) {
        let key = MacDigest::Sha1.derive(ID_KEY, password, salt, iterations, self.key_len());
        let iv = MacDigest::Sha1.derive(ID_IV, password, salt, iterations, 8);
        (key, iv)
    }

    pub fn decrypt(
        self,
        ciphertext: &[u8],
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>, Pkcs12Error> {
        let (key, iv) = self.key_and_iv(password, salt, iterations);
        match self {
            LegacyCipher::TripleDes => Des3CbcDec::new_from_slices(&key, &iv)
                .map_err(|_| Pkcs12Error::Decrypt)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| Pkcs12Error::Decrypt),
            LegacyCipher::Rc2With128BitKey | LegacyCipher::Rc2With40BitKey => {
                let cipher = Rc2::new_with_eff_key_len(&key, key.len() * 8);
                Rc2CbcDec::inner_iv_slice_init(cipher, &iv)
                    .map_err(|_| Pkcs12Error::Decrypt)?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| Pkcs12Error::Decrypt)
            }
        }
    }

    pub fn encrypt(
        self,
        plaintext: &[u8],
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>, Pkcs12Error> {
        let (key, iv) = self.key_and_iv(password, salt, iterations);
        match self {
            LegacyCipher::TripleDes => Ok(Des3CbcEnc::new_from_slices(&key, &iv)
                .map_err(|e| Pkcs12Error::Encode(format!("3DES-CBC init failed: {e}")))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            LegacyCipher::Rc2With128BitKey | LegacyCipher::Rc2With40BitKey => {
                let cipher = Rc2::new_with_eff_key_len(&key, key.len() * 8);
                Ok(Rc2CbcEnc::inner_iv_slice_init(cipher, &iv)
                    .map_err(|e| Pkcs12Error::Encode(format!("RC2-CBC init failed: {e}")))?
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
        }
    }
}

/// PBKDF2 pseudo random function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prf {
    HmacSha1,
    HmacSha256,
    HmacSha512,
}

/// AES-CBC variants accepted as the PBES2 encryption scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesCbc {
    Aes128,
    Aes192,
    Aes256,
}

impl AesCbc {
    fn key_len(self) -> usize {
        match self {
            AesCbc::Aes128 => 16,
            AesCbc::Aes192 => 24,
            AesCbc::Aes256 => 32,
        }
    }
}

/// Decrypt with PBES2: PBKDF2 over the UTF-8 password, then AES-CBC.
pub fn pbes2_decrypt(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    prf: Prf,
    cipher: AesCbc,
    iv: &[u8],
) -> Result<Vec<u8>, Pkcs12Error> {
    let mut key = vec![0u8; cipher.key_len()];
    match prf {
        Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key),
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key)
        }
        Prf::HmacSha512 => {
            pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations, &mut key)
        }
    }

    let plaintext = match cipher {
        AesCbc::Aes128 => Aes128CbcDec::new_from_slices(&key, iv)
            .map_err(|_| Pkcs12Error::Decrypt)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        AesCbc::Aes192 => Aes192CbcDec::new_from_slices(&key, iv)
            .map_err(|_| Pkcs12Error::Decrypt)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        AesCbc::Aes256 => Aes256CbcDec::new_from_slices(&key, iv)
            .map_err(|_| Pkcs12Error::Decrypt)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    };

    plaintext.map_err(|_| Pkcs12Error::Decrypt)
}
